//! 本地缓存层
//!
//! 会话核心只通过 [`PortalCache`] 访问记住的凭据和成绩单缓存。

pub mod factory;
pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Credentials, Transcript};

pub use factory::CacheFactory;
pub use file::FileCache;
pub use memory::InMemoryCache;

/// 缓存 trait
///
/// `load_*` 在缓存不存在时返回 `Ok(None)`；删除不存在的条目不是错误。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortalCache: Send + Sync {
    /// 读取记住的凭据
    async fn load_credentials(&self) -> Result<Option<Credentials>>;

    /// 记住凭据
    async fn save_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// 忘记凭据
    async fn delete_credentials(&self) -> Result<()>;

    /// 读取成绩单缓存
    async fn load_transcript(&self) -> Result<Option<Transcript>>;

    /// 写入成绩单缓存
    async fn save_transcript(&self, transcript: &Transcript) -> Result<()>;

    /// 删除成绩单缓存
    async fn delete_transcript(&self) -> Result<()>;
}
