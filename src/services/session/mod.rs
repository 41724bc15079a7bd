//! 会话服务
//!
//! 一个会话独占一组认证 Cookie 和一个学生聚合。所有改变状态的操作都取
//! `&mut self`，同一会话同一时刻只有一个操作在进行。

use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::PortalClient;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{Course, Credentials, Student, Transcript};
use crate::observability::FetchMetrics;
use crate::parser::pages::{parse_assessments, parse_course_list};
use crate::parser::profile::apply_profile;
use crate::parser::tokens::extract_span_texts;
use crate::parser::transcript::parse_totals;
use crate::parser::{extract_tokens, parse_attendance, parse_transcript};
use crate::security::{Sanitizable, Validatable};
use crate::services::report::{ReportFetcher, ReportRequest};
use crate::storage::PortalCache;

/// 登录成功所需的最少 Cookie 数
pub const MIN_SESSION_COOKIES: usize = 3;

/// 门户会话
pub struct Session {
    config: AppConfig,
    fetcher: ReportFetcher,
    client: Option<PortalClient>,
    student: Student,
}

impl Session {
    pub fn new(config: AppConfig, metrics: FetchMetrics) -> Self {
        let fetcher = ReportFetcher::new(config.report.clone(), metrics);
        Self {
            config,
            fetcher,
            client: None,
            student: Student::default(),
        }
    }

    pub fn student(&self) -> &Student {
        &self.student
    }

    pub fn metrics(&self) -> &FetchMetrics {
        self.fetcher.metrics()
    }

    /// 会话持有足够的认证 Cookie
    pub fn is_logged_in(&self) -> bool {
        self.client.as_ref().is_some_and(|client| {
            client
                .cookie_count(&client.endpoints().login())
                .is_ok_and(|n| n >= MIN_SESSION_COOKIES)
        })
    }

    fn client(&self) -> Result<PortalClient> {
        self.client
            .clone()
            .ok_or_else(|| AppError::NotLoggedIn("no session cookies".into()))
    }

    fn require_course(&self, course_id: &str) -> Result<()> {
        match self.student.course(course_id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("course {course_id}"))),
        }
    }

    // ===== Login =====

    /// 登录并抓取学生档案
    ///
    /// Cookie 层面登录成功但档案页无法解析时返回 [`AppError::Parsing`]，
    /// 会话仍保持登录状态。
    pub async fn login(&mut self, credentials: &Credentials, cache: &dyn PortalCache) -> Result<()> {
        let mut credentials = credentials.clone();
        credentials.sanitize();
        credentials
            .validate()
            .map_err(|e| AppError::InvalidCredentials(e.to_string()))?;

        let client = PortalClient::new(&self.config.portal)?;
        let cookies = client.submit_login(&credentials).await?;
        if cookies < MIN_SESSION_COOKIES {
            warn!(student_id = %credentials.student_id, cookies, "login rejected");
            return Err(AppError::InvalidCredentials(format!(
                "portal returned {cookies} cookies"
            )));
        }

        self.client = Some(client);
        self.student = Student {
            email: format!(
                "{}@{}",
                credentials.student_id.to_uppercase(),
                self.config.portal.email_domain
            ),
            id: credentials.student_id,
            ..Student::default()
        };
        info!(student_id = %self.student.id, cookies, "logged in");

        match cache.load_transcript().await {
            Ok(Some(transcript)) => self.student.transcript = transcript,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cached transcript unreadable, ignoring"),
        }

        self.fetch_profile().await
    }

    /// 抓取仪表盘并按绑定表填充档案字段
    pub async fn fetch_profile(&mut self) -> Result<()> {
        let client = self.client()?;
        let body = client.get_text(&client.endpoints().dashboard()).await?;

        let document = Html::parse_document(&body);
        let matched = apply_profile(&document, &mut self.student)?;
        info!(matched, name = %self.student.name, "profile loaded");
        Ok(())
    }

    // ===== Courses =====

    /// 重新抓取课程列表，替换现有列表
    pub async fn fetch_courses(&mut self) -> Result<&[Course]> {
        let client = self.client()?;
        let body = client.get_text(&client.endpoints().courses()).await?;

        let courses = parse_course_list(&Html::parse_document(&body))?;
        info!(count = courses.len(), "course list loaded");
        self.student.courses = courses;
        Ok(&self.student.courses)
    }

    /// 抓取课程考核，不重试
    pub async fn fetch_course_assessments(&mut self, course_id: &str) -> Result<()> {
        let client = self.client()?;
        self.require_course(course_id)?;

        let body = client
            .get_text(&client.endpoints().assessments(course_id))
            .await?;
        let assessments = parse_assessments(&Html::parse_document(&body))?;

        let course = self
            .student
            .course_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("course {course_id}")))?;
        info!(course_id, count = assessments.len(), "assessments loaded");
        course.assessments = assessments;
        Ok(())
    }

    /// 抓取课程考勤
    ///
    /// `refresh` 为 false 且已有考勤记录时直接使用已有记录。
    pub async fn fetch_course_attendance(
        &mut self,
        course_id: &str,
        refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let client = self.client()?;
        self.require_course(course_id)?;

        if !refresh
            && self
                .student
                .course(course_id)
                .is_some_and(|c| !c.attendance.is_empty())
        {
            return Ok(());
        }

        let request = ReportRequest::attendance(client.endpoints(), course_id);
        let tokens = self
            .fetcher
            .fetch_with(&client, &request, cancel, |body| {
                extract_tokens(&Html::parse_document(body))
            })
            .await?;
        let parsed = parse_attendance(&tokens);

        let course = self
            .student
            .course_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("course {course_id}")))?;
        info!(
            course_id,
            lectures = parsed.summary.records.len(),
            percentage = parsed.summary.percentage,
            "attendance loaded"
        );
        course.apply_attendance(parsed.summary);
        Ok(())
    }

    // ===== Transcript =====

    /// 成绩单状态机：TryCache → Fetch → Persist
    pub async fn fetch_transcript(
        &mut self,
        refresh: bool,
        cache: &dyn PortalCache,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !refresh {
            match cache.load_transcript().await {
                Ok(Some(transcript)) => {
                    info!(semesters = transcript.len(), "transcript loaded from cache");
                    self.student.transcript = transcript;
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cached transcript unreadable, fetching"),
            }
        }

        let client = self.client()?;
        let request = ReportRequest::transcript(client.endpoints());
        let transcript = self
            .fetcher
            .fetch_with(&client, &request, cancel, digest_transcript)
            .await?;

        info!(
            semesters = transcript.len(),
            cgpa = %transcript.total_cgpa,
            "transcript fetched"
        );
        if let Err(e) = cache.save_transcript(&transcript).await {
            warn!(error = %e, "failed to persist transcript cache");
        }

        if !transcript.total_cgpa.is_empty() {
            self.student.cgpa_earned = transcript.total_cgpa.clone();
        }
        self.student.transcript = transcript;
        Ok(())
    }

    /// 丢弃 Cookie 与学生数据
    pub fn logout(&mut self) {
        if self.client.take().is_some() {
            info!(student_id = %self.student.id, "logged out");
        }
        self.student = Student::default();
    }
}

/// 将成绩单报表解析为 [`Transcript`]；没有任何 token 视为可重试的解析失败
fn digest_transcript(body: &str) -> Result<Transcript> {
    let document = Html::parse_document(body);
    let tokens = extract_tokens(&document)?;
    if tokens.is_empty() {
        return Err(AppError::Parsing("no transcript data found in response".into()));
    }

    let totals = parse_totals(&extract_span_texts(&document)?);
    let parsed = parse_transcript(&tokens);
    let mut transcript = parsed.transcript;
    totals.apply(&mut transcript, &parsed.tally);
    Ok(transcript)
}
