//! 门户门面
//!
//! 组合会话、缓存、指标和取消令牌，向展示层提供登录、课程、考勤、
//! 考核、成绩单和登出操作。

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result, StatusReply};
use crate::models::{Course, Credentials, Student};
use crate::observability::FetchMetrics;
use crate::services::Session;
use crate::storage::{CacheFactory, PortalCache};

/// 门户门面
pub struct Portal {
    session: Session,
    cache: Arc<dyn PortalCache>,
    metrics: FetchMetrics,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("session", &"Session")
            .field("cache", &"Arc<dyn PortalCache>")
            .field("metrics", &self.metrics.snapshot())
            .field("logged_in", &self.session.is_logged_in())
            .finish()
    }
}

impl Portal {
    /// 按配置创建缓存
    pub fn new(config: AppConfig) -> Self {
        let cache = CacheFactory::create(&config.cache);
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: AppConfig, cache: Arc<dyn PortalCache>) -> Self {
        let metrics = FetchMetrics::default();
        Self {
            session: Session::new(config, metrics.clone()),
            cache,
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    pub fn student(&self) -> &Student {
        self.session.student()
    }

    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    /// 取消令牌的克隆，可在其他任务中中止正在进行的报表抓取
    pub fn canceller(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 取消后换一个新令牌，后续操作不受影响
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(AppError::Cancelled)) || self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        result
    }

    // ===== Login =====

    /// 登录；`remember` 为真且登录完全成功时记住凭据
    pub async fn login(&mut self, credentials: &Credentials, remember: bool) -> StatusReply {
        let result = self.session.login(credentials, self.cache.as_ref()).await;

        if result.is_ok() && remember {
            if let Err(e) = self.cache.save_credentials(credentials).await {
                warn!(error = %e, "failed to remember credentials");
            }
        }
        if let Err(e) = &result {
            warn!(error = %e, "login failed");
        }

        StatusReply::from(&result)
    }

    /// 使用记住的凭据自动登录
    pub async fn resume(&mut self) -> StatusReply {
        let credentials = match self.cache.load_credentials().await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                return StatusReply::from(&AppError::InvalidCredentials(
                    "no remembered credentials".into(),
                ));
            }
            Err(e) => return StatusReply::from(&e),
        };

        info!(student_id = %credentials.student_id, "resuming with remembered credentials");
        self.login(&credentials, true).await
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// 登出并删除记住的凭据与成绩单缓存
    pub async fn logout(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.session.logout();

        if let Err(e) = self.cache.delete_credentials().await {
            warn!(error = %e, "failed to delete remembered credentials");
        }
        if let Err(e) = self.cache.delete_transcript().await {
            warn!(error = %e, "failed to delete transcript cache");
        }
    }

    // ===== Records =====

    pub async fn get_courses(&mut self) -> Result<Vec<Course>> {
        let courses = self.session.fetch_courses().await?.to_vec();
        Ok(courses)
    }

    /// 更新指定课程的考勤记录
    pub async fn get_course_attendance(&mut self, course_id: &str, force_refresh: bool) -> Result<()> {
        let result = self
            .session
            .fetch_course_attendance(course_id, force_refresh, &self.cancel)
            .await;
        self.settle(result)
    }

    pub async fn get_course_assessments(&mut self, course_id: &str) -> Result<()> {
        self.session.fetch_course_assessments(course_id).await
    }

    /// 更新成绩单
    pub async fn get_transcript(&mut self, force_refresh: bool) -> Result<()> {
        let result = self
            .session
            .fetch_transcript(force_refresh, self.cache.as_ref(), &self.cancel)
            .await;
        self.settle(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::storage::InMemoryCache;

    fn portal(cache: Arc<InMemoryCache>) -> Portal {
        Portal::with_cache(AppConfig::for_base_url("http://127.0.0.1:9"), cache)
    }

    #[tokio::test]
    async fn test_resume_without_remembered_credentials() {
        let mut portal = portal(Arc::new(InMemoryCache::new()));
        let reply = portal.resume().await;
        assert_eq!(reply.code, ErrorCode::InvalidCredentials);
        assert!(!portal.is_logged_in());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_before_network() {
        let mut portal = portal(Arc::new(InMemoryCache::new()));
        let reply = portal.login(&Credentials::new("", "pw"), true).await;
        assert_eq!(reply.code, ErrorCode::InvalidCredentials);
        assert!(reply.message.contains("student_id"));
    }

    #[tokio::test]
    async fn test_logout_clears_cache() {
        let cache = Arc::new(InMemoryCache::new());
        cache
            .save_credentials(&Credentials::new("F2021065123", "pw"))
            .await
            .unwrap();
        cache
            .save_transcript(&crate::models::Transcript::default())
            .await
            .unwrap();

        let mut portal = portal(cache.clone());
        portal.logout().await;

        assert!(cache.load_credentials().await.unwrap().is_none());
        assert!(cache.load_transcript().await.unwrap().is_none());
        assert!(!portal.canceller().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_token_is_replaced() {
        let mut portal = portal(Arc::new(InMemoryCache::new()));
        let token = portal.canceller();
        token.cancel();

        let result = portal.settle::<()>(Err(AppError::Cancelled));
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(!portal.canceller().is_cancelled());
    }
}
