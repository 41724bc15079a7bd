//! 报表抓取服务
//!
//! 报表查看器要求按固定顺序请求：预热页 → 报表页（读取隐藏状态）→ 回发。
//! 每次尝试完整执行整个序列；响应过小、传输错误、解析错误都会在本地重试，
//! 直到预算耗尽。

use scraper::Html;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{Endpoints, PortalClient};
use crate::config::ReportConfig;
use crate::error::{AppError, Result};
use crate::observability::FetchMetrics;
use crate::parser::pages::{HiddenState, extract_hidden_state};

/// 异步渲染触发器
const EVENT_TARGET: &str = "Attendance_Report$ctl13$Reserved_AsyncLoadTarget";

/// 报表查看器内部控件状态，必须逐字节一致
const REPORT_CONTROL_FIELDS: [(&str, &str); 16] = [
    ("Attendance_Report$ctl03$ctl00", ""),
    ("Attendance_Report$ctl03$ctl01", ""),
    ("Attendance_Report$isReportViewerInVs", ""),
    ("Attendance_Report$ctl14", ""),
    ("Attendance_Report$ctl15", "standards"),
    ("Attendance_Report$AsyncWait$HiddenCancelField", "False"),
    ("Attendance_Report$ToggleParam$store", ""),
    ("Attendance_Report$ToggleParam$collapse", "false"),
    ("Attendance_Report$ctl12$ClientClickedId", ""),
    ("Attendance_Report$ctl11$store", ""),
    ("Attendance_Report$ctl11$collapse", "false"),
    ("Attendance_Report$ctl13$VisibilityState$ctl00", "None"),
    ("Attendance_Report$ctl13$ScrollPosition", ""),
    ("Attendance_Report$ctl13$ReportControl$ctl02", ""),
    ("Attendance_Report$ctl13$ReportControl$ctl03", ""),
    ("Attendance_Report$ctl13$ReportControl$ctl04", "100"),
];

/// 回发表单：三个隐藏状态值、事件字段和控件状态
pub fn postback_form(state: &HiddenState) -> Vec<(&str, &str)> {
    let mut form = vec![
        ("__VIEWSTATE", state.view_state.as_str()),
        ("__VIEWSTATEGENERATOR", state.view_state_generator.as_str()),
        ("__EVENTVALIDATION", state.event_validation.as_str()),
        ("__EVENTTARGET", EVENT_TARGET),
        ("__EVENTARGUMENT", ""),
    ];
    form.extend(REPORT_CONTROL_FIELDS);
    form
}

/// 一类报表的请求序列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// 日志中的报表名
    pub label: &'static str,
    /// 预热页，响应体丢弃
    pub priming_url: String,
    /// 报表页，也是回发地址
    pub report_url: String,
    /// 是否需要回发；为 false 时报表页的响应即为结果
    pub postback: bool,
}

impl ReportRequest {
    /// 单门课程的考勤报表（完整三阶段）
    pub fn attendance(endpoints: &Endpoints, course_id: &str) -> Self {
        Self {
            label: "attendance",
            priming_url: endpoints.attendance(course_id),
            report_url: endpoints.attendance_report(),
            postback: true,
        }
    }

    /// 成绩单报表（预热页加报表页）
    pub fn transcript(endpoints: &Endpoints) -> Self {
        Self {
            label: "transcript",
            priming_url: endpoints.transcript(),
            report_url: endpoints.transcript_report(),
            postback: false,
        }
    }
}

/// 报表抓取器
#[derive(Clone)]
pub struct ReportFetcher {
    config: ReportConfig,
    metrics: FetchMetrics,
}

impl ReportFetcher {
    pub fn new(config: ReportConfig, metrics: FetchMetrics) -> Self {
        Self { config, metrics }
    }

    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    /// 抓取报表并交给 `digest` 处理
    ///
    /// `digest` 返回可重试错误（解析错误）时同样计入一次失败的尝试。
    /// 不可重试的错误立即返回。
    pub async fn fetch_with<T, F>(
        &self,
        client: &PortalClient,
        request: &ReportRequest,
        cancel: &CancellationToken,
        mut digest: F,
    ) -> Result<T>
    where
        F: FnMut(&str) -> Result<T>,
    {
        let max_attempts = self.config.max_attempts;
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(self.cancelled(request, attempt));
            }

            self.metrics.record_attempt();
            debug!(report = request.label, attempt, max_attempts, "report attempt");

            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled(request, attempt)),
                body = self.attempt(client, request) => body,
            };

            match body.and_then(|body| digest(&body).map(|value| (value, body.len()))) {
                Ok((value, bytes)) => {
                    self.metrics.record_report(bytes);
                    info!(report = request.label, attempt, bytes, "report received");
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    warn!(report = request.label, attempt, max_attempts, error = %e, "report attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                self.metrics.record_retry();
                self.backoff(request, attempt, cancel).await?;
            }
        }

        self.metrics.record_exhausted();
        warn!(report = request.label, attempts = max_attempts, "report retry budget exhausted");
        Err(AppError::Exhausted {
            attempts: max_attempts,
            last: last_error.map(Box::new),
        })
    }

    /// 执行一次完整的请求序列，返回通过大小检查的响应体
    async fn attempt(&self, client: &PortalClient, request: &ReportRequest) -> Result<String> {
        client.touch(&request.priming_url).await?;
        let page = client.get_text(&request.report_url).await?;

        let body = if request.postback {
            let state = extract_hidden_state(&Html::parse_document(&page))?;
            let form = postback_form(&state);
            client
                .post_form(&request.report_url, &form, Some(&request.report_url))
                .await?
        } else {
            page
        };

        if body.len() < self.config.min_body_bytes {
            return Err(AppError::Parsing(format!(
                "响应过小: {} 字节 (< {})",
                body.len(),
                self.config.min_body_bytes
            )));
        }

        Ok(body)
    }

    /// 两次尝试之间等待，可被取消
    async fn backoff(
        &self,
        request: &ReportRequest,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let delay: Duration = self.config.retry_delay();
        if delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(self.cancelled(request, attempt)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn cancelled(&self, request: &ReportRequest, attempt: u32) -> AppError {
        self.metrics.record_cancelled();
        info!(report = request.label, attempt, "report fetch cancelled");
        AppError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPORT_PAGE: &str = r#"<form>
        <input type="hidden" name="__VIEWSTATE" value="vs+/=" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" value="5A1C" />
        <input type="hidden" name="__EVENTVALIDATION" value="ev" />
    </form>"#;

    fn fetcher(max_attempts: u32, min_body_bytes: usize) -> ReportFetcher {
        ReportFetcher::new(
            ReportConfig {
                max_attempts,
                retry_delay_ms: 0,
                min_body_bytes,
            },
            FetchMetrics::default(),
        )
    }

    fn client_for(server: &MockServer) -> PortalClient {
        let config = PortalConfig {
            base_url: server.uri(),
            ..PortalConfig::default()
        };
        PortalClient::new(&config).unwrap()
    }

    async fn mount_report_pages(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/Attendance/ViewAttendance"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Reports/Attendance.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(REPORT_PAGE))
            .mount(server)
            .await;
    }

    #[test]
    fn test_postback_form_fields() {
        let state = HiddenState {
            view_state: "vs".into(),
            view_state_generator: "gen".into(),
            event_validation: "ev".into(),
        };
        let form = postback_form(&state);
        assert_eq!(form.len(), 21);
        assert_eq!(form[0], ("__VIEWSTATE", "vs"));
        assert!(form.contains(&("__EVENTTARGET", EVENT_TARGET)));
        assert!(form.contains(&("__EVENTARGUMENT", "")));
        assert!(form.contains(&("Attendance_Report$ctl15", "standards")));
        assert!(form.contains(&("Attendance_Report$AsyncWait$HiddenCancelField", "False")));
        assert!(form.contains(&("Attendance_Report$ctl13$ReportControl$ctl04", "100")));
    }

    #[tokio::test]
    async fn test_postback_succeeds_first_attempt() {
        let server = MockServer::start().await;
        mount_report_pages(&server).await;
        Mock::given(method("POST"))
            .and(path("/Reports/Attendance.aspx"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("__VIEWSTATEGENERATOR=5A1C"))
            .and(body_string_contains("ctl15=standards"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let fetcher = fetcher(3, 32);
        let request = ReportRequest::attendance(client.endpoints(), "42");

        let len = fetcher
            .fetch_with(&client, &request, &CancellationToken::new(), |body| Ok(body.len()))
            .await
            .unwrap();
        assert_eq!(len, 64);

        let snapshot = fetcher.metrics().snapshot();
        assert_eq!(snapshot.attempts_total, 1);
        assert_eq!(snapshot.retries_total, 0);
        assert_eq!(snapshot.bytes_received, 64);
    }

    #[tokio::test]
    async fn test_undersized_bodies_exhaust_budget() {
        let server = MockServer::start().await;
        mount_report_pages(&server).await;
        Mock::given(method("POST"))
            .and(path("/Reports/Attendance.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string("partial"))
            .expect(4)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let fetcher = fetcher(4, 1000);
        let request = ReportRequest::attendance(client.endpoints(), "42");

        let err = fetcher
            .fetch_with(&client, &request, &CancellationToken::new(), |_| Ok(()))
            .await
            .unwrap_err();

        match err {
            AppError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 4);
                assert!(matches!(last.as_deref(), Some(AppError::Parsing(_))));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let snapshot = fetcher.metrics().snapshot();
        assert_eq!(snapshot.attempts_total, 4);
        assert_eq!(snapshot.retries_total, 3);
        assert_eq!(snapshot.exhausted_total, 1);
    }

    #[tokio::test]
    async fn test_missing_hidden_state_retries_without_postback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ReportRequest::attendance(client.endpoints(), "42");
        let err = fetcher(2, 10)
            .fetch_with(&client, &request, &CancellationToken::new(), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_transient_digest_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("y".repeat(50)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ReportRequest::transcript(client.endpoints());
        let mut calls = 0;
        let value = fetcher(5, 10)
            .fetch_with(&client, &request, &CancellationToken::new(), |_| {
                calls += 1;
                if calls < 3 {
                    Err(AppError::Parsing("no transcript data".into()))
                } else {
                    Ok(calls)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_non_transient_digest_error_stops_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("y".repeat(50)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ReportRequest::transcript(client.endpoints());
        let fetcher = fetcher(5, 10);
        let err = fetcher
            .fetch_with(&client, &request, &CancellationToken::new(), |_| {
                Err::<(), _>(AppError::NotFound("42".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fetcher.metrics().snapshot().attempts_total, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ReportRequest::transcript(client.endpoints());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher = fetcher(10, 10);
        let err = fetcher
            .fetch_with(&client, &request, &cancel, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(fetcher.metrics().snapshot().cancelled_total, 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("short"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ReportRequest::transcript(client.endpoints());
        let fetcher = ReportFetcher::new(
            ReportConfig {
                max_attempts: 10,
                retry_delay_ms: 60_000,
                min_body_bytes: 1000,
            },
            FetchMetrics::default(),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = fetcher
            .fetch_with(&client, &request, &cancel, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(fetcher.metrics().snapshot().attempts_total, 1);
    }
}
