use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 门户连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// 门户根地址
    pub base_url: String,
    /// 学生邮箱域名
    pub email_domain: String,
    /// User-Agent 请求头
    pub user_agent: String,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://online.umt.edu.pk".into(),
            email_domain: "umt.edu.pk".into(),
            user_agent: concat!("umt-portal/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_secs: 30,
        }
    }
}

impl PortalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 报表抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 两次尝试之间的等待（毫秒）
    pub retry_delay_ms: u64,
    /// 响应体低于该字节数视为渲染不完整
    pub min_body_bytes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 2000,
            min_body_bytes: 30_000,
        }
    }
}

impl ReportConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// 本地缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存根目录，未设置时使用系统用户缓存目录
    pub dir: Option<PathBuf>,
    /// 根目录下的应用子目录
    pub app_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            app_dir: "umt_tui".into(),
        }
    }
}

impl CacheConfig {
    /// 解析最终缓存目录
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        let root = match &self.dir {
            Some(dir) => dir.clone(),
            None => directories::BaseDirs::new()?.cache_dir().to_path_buf(),
        };
        Some(root.join(&self.app_dir))
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 门户连接配置
    pub portal: PortalConfig,
    /// 报表抓取配置
    pub report: ReportConfig,
    /// 缓存配置
    pub cache: CacheConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 指向测试服务器的配置：不等待重试、缓存写到指定目录
    pub fn for_base_url(base_url: &str) -> Self {
        let mut config = Self::default();
        config.portal.base_url = base_url.to_string();
        config.report.retry_delay_ms = 0;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_defaults_match_portal_protocol() {
        let report = ReportConfig::default();
        assert_eq!(report.max_attempts, 10);
        assert_eq!(report.retry_delay(), Duration::from_secs(2));
        assert_eq!(report.min_body_bytes, 30_000);
    }

    #[test]
    fn test_cache_dir_uses_app_subdir() {
        let cache = CacheConfig {
            dir: Some(PathBuf::from("/tmp/portal-cache")),
            ..CacheConfig::default()
        };
        assert_eq!(
            cache.resolve_dir(),
            Some(PathBuf::from("/tmp/portal-cache/umt_tui"))
        );
    }
}
