//! 门户 HTTP 客户端
//!
//! 持有一个传输层和一个 Cookie 集合，对固定的门户端点执行请求。
//! 门户不提供 API，这里只负责收发 HTML，不解析内容。

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::REFERER;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

use crate::config::PortalConfig;
use crate::error::{AppError, Result};
use crate::models::Credentials;

/// 登录表单中安全码字段的固定占位值，门户并不校验
const SECURITY_CODE_PLACEHOLDER: &str = "abcde";

/// 门户端点表
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn login(&self) -> String {
        self.url("/Account/Login")
    }

    /// 学生仪表盘（档案页）
    pub fn dashboard(&self) -> String {
        self.url("/CourseRequest")
    }

    pub fn courses(&self) -> String {
        self.url("/MyCourses")
    }

    pub fn assessments(&self, course_id: &str) -> String {
        self.url(&format!("/MyCourses/ViewAssesments?id={course_id}"))
    }

    /// 考勤报表的预热页，建立课程范围的报表会话
    pub fn attendance(&self, course_id: &str) -> String {
        self.url(&format!("/Attendance/ViewAttendance?id={course_id}"))
    }

    pub fn attendance_report(&self) -> String {
        self.url("/Reports/Attendance.aspx")
    }

    /// 成绩单报表的预热页
    pub fn transcript(&self) -> String {
        self.url("/Transcript")
    }

    pub fn transcript_report(&self) -> String {
        self.url("/Reports/Transcript.aspx")
    }
}

/// 门户客户端
///
/// 每次登录都应创建新的客户端，使 Cookie 集合与身份一一对应。
#[derive(Clone)]
pub struct PortalClient {
    http_client: Arc<reqwest::Client>,
    jar: Arc<Jar>,
    endpoints: Endpoints,
}

impl PortalClient {
    /// 创建带空 Cookie 集合的客户端
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http_client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client: Arc::new(http_client),
            jar,
            endpoints: Endpoints::new(&config.base_url),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GET 并读取完整响应体
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.http_client.get(url).send().await?;
        debug!(url, status = %response.status(), "GET");
        Ok(response.text().await?)
    }

    /// GET 并丢弃响应体，只为更新 Cookie
    pub async fn touch(&self, url: &str) -> Result<()> {
        let response = self.http_client.get(url).send().await?;
        debug!(url, status = %response.status(), "GET (body discarded)");
        Ok(())
    }

    /// 以 `application/x-www-form-urlencoded` 提交表单
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<String> {
        let mut request = self.http_client.post(url).form(form);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request.send().await?;
        debug!(url, status = %response.status(), fields = form.len(), "POST");
        Ok(response.text().await?)
    }

    /// 提交登录表单，返回登录域下累计的 Cookie 数量
    ///
    /// 传输层成功不代表登录成功；由调用方根据 Cookie 数量判断。
    pub async fn submit_login(&self, credentials: &Credentials) -> Result<usize> {
        let login_url = self.endpoints.login();

        self.touch(&login_url).await?;

        let form = [
            ("student_id", credentials.student_id.as_str()),
            ("Password", credentials.password.as_str()),
            ("SecurityCode", SECURITY_CODE_PLACEHOLDER),
            ("SecurityCodeText", SECURITY_CODE_PLACEHOLDER),
        ];
        self.post_form(&login_url, &form, None).await?;

        self.cookie_count(&login_url)
    }

    /// 对指定地址可见的 Cookie 数量
    pub fn cookie_count(&self, url: &str) -> Result<usize> {
        let url = Url::parse(url)
            .map_err(|e| AppError::Config(format!("invalid portal url '{url}': {e}")))?;

        let count = self
            .jar
            .cookies(&url)
            .and_then(|header| header.to_str().ok().map(count_cookie_pairs))
            .unwrap_or(0);
        Ok(count)
    }

    /// 会话是否持有门户 Cookie
    pub fn has_cookies(&self) -> bool {
        self.cookie_count(&self.endpoints.login())
            .map(|n| n > 0)
            .unwrap_or(false)
    }
}

fn count_cookie_pairs(header: &str) -> usize {
    header
        .split(';')
        .filter(|pair| !pair.trim().is_empty())
        .count()
}
