//! 文件缓存
//!
//! 缓存目录下两个 JSON 文件：`creds.json` 与 `transcript.json`。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::models::{Credentials, Transcript};
use crate::storage::PortalCache;

const CREDENTIALS_FILE: &str = "creds.json";
const TRANSCRIPT_FILE: &str = "transcript.json";

/// 基于本地文件的缓存
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize + Sync>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_vec_pretty(value)?;
        let path = self.path(name);
        fs::write(&path, data).await?;
        debug!(path = %path.display(), "cache written");
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PortalCache for FileCache {
    async fn load_credentials(&self) -> Result<Option<Credentials>> {
        self.read_json(CREDENTIALS_FILE).await
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.write_json(CREDENTIALS_FILE, credentials).await
    }

    async fn delete_credentials(&self) -> Result<()> {
        self.remove(CREDENTIALS_FILE).await
    }

    async fn load_transcript(&self) -> Result<Option<Transcript>> {
        self.read_json(TRANSCRIPT_FILE).await
    }

    async fn save_transcript(&self, transcript: &Transcript) -> Result<()> {
        self.write_json(TRANSCRIPT_FILE, transcript).await
    }

    async fn delete_transcript(&self) -> Result<()> {
        self.remove(TRANSCRIPT_FILE).await
    }
}
