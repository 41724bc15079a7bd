//! 学生档案抓取
//!
//! 仪表盘页面没有语义标记，字段含义完全由匹配顺序决定。
//! 每条绑定 {选择器, 序号, 字段} 独立声明，便于针对固定 HTML 单独测试。

use scraper::Html;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::Student;
use crate::parser::html::{collapsed_text_of, selector, text_of};

/// 可由档案页填充的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Name,
    Batch,
    RequestedCreditHours,
    Program,
    CgpaEarned,
    RequiredCreditHours,
    ProgramLevel,
    CompletedCreditHours,
    CurrentSemester,
    MaxAllowedCreditHours,
}

/// 一条序号绑定：`selector` 的第 `ordinal` 个匹配（从 0 开始）写入 `field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileBinding {
    pub selector: &'static str,
    pub ordinal: usize,
    pub field: ProfileField,
    /// 是否把内部空白折叠为单个空格
    pub collapse_whitespace: bool,
}

const fn bind(
    selector: &'static str,
    ordinal: usize,
    field: ProfileField,
    collapse_whitespace: bool,
) -> ProfileBinding {
    ProfileBinding {
        selector,
        ordinal,
        field,
        collapse_whitespace,
    }
}

const PRIMARY: &str = ".widget-numbers.text-primary";
const SUCCESS: &str = ".text-success";
const INFO: &str = ".widget-numbers.text-info";
const WARNING: &str = ".text-warning";
const DANGER: &str = ".widget-numbers.text-danger";

/// 档案页绑定表
pub const PROFILE_BINDINGS: [ProfileBinding; 10] = [
    bind(PRIMARY, 0, ProfileField::Name, true),
    bind(PRIMARY, 1, ProfileField::Batch, true),
    bind(PRIMARY, 2, ProfileField::RequestedCreditHours, true),
    bind(SUCCESS, 0, ProfileField::Program, false),
    bind(SUCCESS, 1, ProfileField::CgpaEarned, false),
    bind(SUCCESS, 2, ProfileField::RequiredCreditHours, false),
    bind(INFO, 0, ProfileField::ProgramLevel, false),
    bind(INFO, 1, ProfileField::CompletedCreditHours, false),
    bind(WARNING, 0, ProfileField::CurrentSemester, false),
    bind(DANGER, 0, ProfileField::MaxAllowedCreditHours, false),
];

/// 按绑定表读取字段原文，未匹配的绑定不出现在结果中
pub fn scrape_bindings(document: &Html) -> Result<Vec<(ProfileField, String)>> {
    let mut values = Vec::with_capacity(PROFILE_BINDINGS.len());

    for binding in &PROFILE_BINDINGS {
        let sel = selector(binding.selector)?;
        if let Some(element) = document.select(&sel).nth(binding.ordinal) {
            let text = if binding.collapse_whitespace {
                collapsed_text_of(&element)
            } else {
                text_of(&element)
            };
            values.push((binding.field, text));
        }
    }

    Ok(values)
}

/// 抓取档案并写入 `student`
///
/// 成绩单中已有的 CGPA 与已修学分优先于页面值。
/// 没有任何绑定命中时返回 [`AppError::Parsing`]。
pub fn apply_profile(document: &Html, student: &mut Student) -> Result<usize> {
    let values = scrape_bindings(document)?;
    if values.is_empty() {
        return Err(AppError::Parsing(
            "dashboard page matched none of the profile bindings".into(),
        ));
    }

    let matched = values.len();
    for (field, text) in values {
        match field {
            ProfileField::Name => student.name = text,
            ProfileField::Batch => student.batch = text,
            ProfileField::RequestedCreditHours => student.requested_credit_hours = text,
            ProfileField::Program => student.program = text,
            ProfileField::CgpaEarned => {
                student.cgpa_earned = override_or(&student.transcript.total_cgpa, text)
            }
            ProfileField::RequiredCreditHours => student.required_credit_hours = text,
            ProfileField::ProgramLevel => student.program_level = text,
            ProfileField::CompletedCreditHours => {
                student.completed_credit_hours =
                    override_or(&student.transcript.credit_hours_earned, text)
            }
            ProfileField::CurrentSemester => student.current_semester = text,
            ProfileField::MaxAllowedCreditHours => student.max_allowed_credit_hours = text,
        }
    }

    debug!(matched, total = PROFILE_BINDINGS.len(), "profile bindings applied");
    Ok(matched)
}

fn override_or(cached: &str, scraped: String) -> String {
    if cached.is_empty() {
        scraped
    } else {
        cached.to_string()
    }
}
