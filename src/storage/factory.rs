//! 缓存工厂
//!
//! 根据配置创建缓存实例。

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::storage::{FileCache, InMemoryCache, PortalCache};

/// 缓存工厂
pub struct CacheFactory;

impl CacheFactory {
    /// 能确定缓存目录时使用文件缓存，否则退回内存缓存
    pub fn create(config: &CacheConfig) -> Arc<dyn PortalCache> {
        match config.resolve_dir() {
            Some(dir) => {
                info!(dir = %dir.display(), "using file cache");
                Arc::new(FileCache::new(dir))
            }
            None => {
                warn!("no user cache directory available, cache is kept in memory");
                Arc::new(InMemoryCache::new())
            }
        }
    }
}
