//! 可观测性模块
//!
//! 提供结构化日志初始化和报表抓取指标。

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

// ===== Fetch Metrics =====

/// 报表抓取指标
#[derive(Clone, Default)]
pub struct FetchMetrics {
    pub attempts_total: Arc<AtomicU64>,
    pub retries_total: Arc<AtomicU64>,
    pub reports_total: Arc<AtomicU64>,
    pub exhausted_total: Arc<AtomicU64>,
    pub cancelled_total: Arc<AtomicU64>,
    pub bytes_received: Arc<AtomicU64>,
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchMetricsSnapshot {
    pub attempts_total: u64,
    pub retries_total: u64,
    pub reports_total: u64,
    pub exhausted_total: u64,
    pub cancelled_total: u64,
    pub bytes_received: u64,
}

impl FetchMetrics {
    /// 记录一次尝试
    pub fn record_attempt(&self) {
        self.attempts_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录一次重试
    pub fn record_retry(&self) {
        self.retries_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录收到的报表
    pub fn record_report(&self, bytes: usize) {
        self.reports_total.fetch_add(1, Ordering::SeqCst);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn record_exhausted(&self) {
        self.exhausted_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cancelled(&self) {
        self.cancelled_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> FetchMetricsSnapshot {
        FetchMetricsSnapshot {
            attempts_total: self.attempts_total.load(Ordering::SeqCst),
            retries_total: self.retries_total.load(Ordering::SeqCst),
            reports_total: self.reports_total.load(Ordering::SeqCst),
            exhausted_total: self.exhausted_total.load(Ordering::SeqCst),
            cancelled_total: self.cancelled_total.load(Ordering::SeqCst),
            bytes_received: self.bytes_received.load(Ordering::SeqCst),
        }
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP report_attempts_total Report fetch attempts
# TYPE report_attempts_total counter
report_attempts_total {}
# HELP report_retries_total Report fetch retries
# TYPE report_retries_total counter
report_retries_total {}
# HELP reports_total Accepted report renders
# TYPE reports_total counter
reports_total {}
# HELP report_exhausted_total Report fetches that ran out of attempts
# TYPE report_exhausted_total counter
report_exhausted_total {}
# HELP report_cancelled_total Report fetches cancelled by the caller
# TYPE report_cancelled_total counter
report_cancelled_total {}
# HELP report_bytes_received Bytes received in accepted reports
# TYPE report_bytes_received counter
report_bytes_received {}
"#,
            s.attempts_total,
            s.retries_total,
            s.reports_total,
            s.exhausted_total,
            s.cancelled_total,
            s.bytes_received,
        )
    }
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时按天滚动写文件，
/// 返回的 guard 必须在进程结束前保持存活。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},umt_portal={}", config.level, config.level)));

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "umt-portal.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    let result = match (writer, config.structured) {
        (Some(writer), true) => builder.json().with_writer(writer).try_init(),
        (Some(writer), false) => builder.with_ansi(false).with_writer(writer).try_init(),
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {e}");
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = FetchMetrics::default();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_retry();
        metrics.record_report(31_000);

        let output = metrics.gather();
        assert!(output.contains("report_attempts_total 2"));
        assert!(output.contains("report_retries_total 1"));
        assert!(output.contains("reports_total 1"));
        assert!(output.contains("report_bytes_received 31000"));
    }

    #[test]
    fn test_metrics_shared_between_clones() {
        let metrics = FetchMetrics::default();
        let clone = metrics.clone();
        clone.record_exhausted();
        clone.record_cancelled();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.exhausted_total, 1);
        assert_eq!(snapshot.cancelled_total, 1);
        assert_eq!(snapshot.attempts_total, 0);
    }
}
