//! 内存缓存，用于测试和不落盘的运行方式

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::models::{Credentials, Transcript};
use crate::storage::PortalCache;

#[derive(Debug, Default)]
pub struct InMemoryCache {
    credentials: RwLock<Option<Credentials>>,
    transcript: RwLock<Option<Transcript>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortalCache for InMemoryCache {
    async fn load_credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.credentials.read().clone())
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        *self.credentials.write() = Some(credentials.clone());
        Ok(())
    }

    async fn delete_credentials(&self) -> Result<()> {
        self.credentials.write().take();
        Ok(())
    }

    async fn load_transcript(&self) -> Result<Option<Transcript>> {
        Ok(self.transcript.read().clone())
    }

    async fn save_transcript(&self, transcript: &Transcript) -> Result<()> {
        *self.transcript.write() = Some(transcript.clone());
        Ok(())
    }

    async fn delete_transcript(&self) -> Result<()> {
        self.transcript.write().take();
        Ok(())
    }
}
