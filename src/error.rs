//! 错误处理模块
//!
//! 定义应用程序的错误类型，以及传递给展示层的粗粒度状态码。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 凭据被拒绝或缺失
    #[error("认证失败: {0}")]
    InvalidCredentials(String),

    /// 会话中没有认证 Cookie
    #[error("未登录: {0}")]
    NotLoggedIn(String),

    /// 网络传输错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 页面结构与预期不符
    #[error("解析错误: {0}")]
    Parsing(String),

    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 重试预算耗尽
    #[error("{attempts} 次尝试后仍未获得有效报表{}", describe_last(.last))]
    Exhausted {
        attempts: u32,
        last: Option<Box<AppError>>,
    },

    /// 调用方取消了操作
    #[error("操作已取消")]
    Cancelled,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

fn describe_last(last: &Option<Box<AppError>>) -> String {
    last.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
}

impl AppError {
    /// 报表重试循环内可在本地重试的错误
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Parsing(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 展示层可见的状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    None,
    InvalidCredentials,
    NetworkIssue,
    ParsingError,
    NotFound,
    Exhausted,
    Cancelled,
}

/// 状态码映射
impl From<&AppError> for ErrorCode {
    fn from(err: &AppError) -> ErrorCode {
        match err {
            AppError::InvalidCredentials(_) | AppError::NotLoggedIn(_) => {
                ErrorCode::InvalidCredentials
            }
            AppError::Network(_) => ErrorCode::NetworkIssue,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Exhausted { .. } => ErrorCode::Exhausted,
            AppError::Cancelled => ErrorCode::Cancelled,
            _ => ErrorCode::ParsingError,
        }
    }
}

/// 展示层的应答：状态码加一条简短消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub code: ErrorCode,
    pub message: String,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            code: ErrorCode::None,
            message: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::None
    }
}

impl From<&AppError> for StatusReply {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.into(),
            message: err.to_string(),
        }
    }
}

impl<T> From<&Result<T>> for StatusReply {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => StatusReply::ok(),
            Err(e) => e.into(),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            ErrorCode::from(&AppError::InvalidCredentials("x".into())),
            ErrorCode::InvalidCredentials
        );
        assert_eq!(
            ErrorCode::from(&AppError::NotLoggedIn("x".into())),
            ErrorCode::InvalidCredentials
        );
        assert_eq!(
            ErrorCode::from(&AppError::Network("x".into())),
            ErrorCode::NetworkIssue
        );
        assert_eq!(
            ErrorCode::from(&AppError::Io("x".into())),
            ErrorCode::ParsingError
        );
        assert_eq!(
            ErrorCode::from(&AppError::Exhausted {
                attempts: 10,
                last: None
            }),
            ErrorCode::Exhausted
        );
    }

    #[test]
    fn test_exhausted_carries_last_cause() {
        let err = AppError::Exhausted {
            attempts: 10,
            last: Some(Box::new(AppError::Parsing("响应过小: 120 字节".into()))),
        };
        let message = err.to_string();
        assert!(message.starts_with("10 次尝试"));
        assert!(message.contains("响应过小"));

        let bare = AppError::Exhausted {
            attempts: 3,
            last: None,
        };
        assert_eq!(bare.to_string(), "3 次尝试后仍未获得有效报表");
    }

    #[test]
    fn test_status_reply_from_result() {
        let ok: Result<()> = Ok(());
        assert!(StatusReply::from(&ok).is_ok());

        let err: Result<()> = Err(AppError::NotFound("course 42".into()));
        let reply = StatusReply::from(&err);
        assert_eq!(reply.code, ErrorCode::NotFound);
        assert!(reply.message.contains("course 42"));
    }
}
