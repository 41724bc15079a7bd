use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::PathBuf;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "umt-portal.toml";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "UMT_PORTAL_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 搜索路径：
    /// 1. ./umt-portal.toml
    /// 2. 环境变量（`UMT_PORTAL_REPORT__MAX_ATTEMPTS=3`）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        let base = config.portal.base_url.trim();
        if base.is_empty() {
            return Err(ConfigValidationError::MissingBaseUrl);
        }

        match reqwest::Url::parse(base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigValidationError::InvalidBaseUrl(base.to_string())),
        }

        if config.report.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidAttempts);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("门户地址未配置")]
    MissingBaseUrl,

    #[error("门户地址无效: {0}")]
    InvalidBaseUrl(String),

    #[error("报表最大尝试次数必须大于 0")]
    InvalidAttempts,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(ConfigLoader::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.portal.base_url = "  ".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingBaseUrl)
        ));

        config.portal.base_url = "ftp://online.umt.edu.pk".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidBaseUrl(_))
        ));

        let mut config = AppConfig::default();
        config.report.max_attempts = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidAttempts)
        ));
    }

    #[test]
    fn test_load_from_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "portal.toml",
                r#"
                [portal]
                base_url = "http://127.0.0.1:9000"

                [report]
                retry_delay_ms = 5
                "#,
            )?;
            jail.set_env("UMT_PORTAL_REPORT__MAX_ATTEMPTS", "3");

            let config = ConfigLoader::load_from(PathBuf::from("portal.toml"))?;
            assert_eq!(config.portal.base_url, "http://127.0.0.1:9000");
            assert_eq!(config.report.retry_delay_ms, 5);
            assert_eq!(config.report.max_attempts, 3);
            assert_eq!(config.report.min_body_bytes, 30_000);
            Ok(())
        });
    }
}
