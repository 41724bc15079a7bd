//! 普通 HTML 页面解析：课程列表、考核表、报表页隐藏字段

use scraper::{ElementRef, Html};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{Assessment, Course};
use crate::parser::html::{selector, text_of};

const COURSE_FIELDS: usize = 9;
const PROTECTED_EMAIL: &str = "[email protected]";

// ===== Course List =====

/// 解码 Cloudflare 混淆的邮箱：十六进制串，首字节为异或密钥
pub fn decode_cf_email(encoded: &str) -> Option<String> {
    let bytes = hex::decode(encoded).ok()?;
    let (key, rest) = bytes.split_first()?;
    let decoded: Vec<u8> = rest.iter().map(|b| b ^ key).collect();
    String::from_utf8(decoded).ok()
}

/// 解析课程列表页
///
/// 重复的课程 ID 只保留第一条。
pub fn parse_course_list(document: &Html) -> Result<Vec<Course>> {
    let rows = selector(".table tr")?;
    let header = selector("th")?;
    let cells = selector("td")?;
    let email_link = selector("a.__cf_email__")?;
    let assessment_link = selector("a.assesment")?;

    let mut courses: Vec<Course> = Vec::new();

    for row in document.select(&rows) {
        if row.select(&header).next().is_some() {
            continue;
        }

        let mut fields = Vec::new();
        let mut assigned_id = String::new();

        for cell in row.select(&cells) {
            if let Some(link) = cell.select(&email_link).next() {
                let field = match link.value().attr("data-cfemail") {
                    Some(encoded) => decode_cf_email(encoded)
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| PROTECTED_EMAIL.to_string()),
                    None => text_of(&cell),
                };
                fields.push(field);
            } else if let Some(link) = cell.select(&assessment_link).next() {
                if let Some(id) = link.value().attr("data-assigned-id") {
                    assigned_id = id.to_string();
                }
                fields.push(String::new());
            } else {
                fields.push(text_of(&cell));
            }
        }

        if fields.len() < COURSE_FIELDS {
            continue;
        }

        if !assigned_id.is_empty() && courses.iter().any(|c| c.id == assigned_id) {
            warn!(course_id = %assigned_id, code = %fields[0], "duplicate course id dropped");
            continue;
        }

        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();
        courses.push(Course {
            id: assigned_id,
            code: next(),
            title: next(),
            credit_hours: next(),
            course_type: next(),
            faculty_name: next(),
            faculty_email: next(),
            mode: next(),
            section: next(),
            semester: next(),
            ..Course::default()
        });
    }

    Ok(courses)
}

// ===== Assessments =====

const ASSESSMENT_HEADERS: [&str; 4] = ["name", "total marks", "obtained marks", "assigned date"];

fn is_assessment_table(table: &ElementRef<'_>) -> Result<bool> {
    let rows = selector("tr")?;
    let header = selector("th")?;

    let Some(first_row) = table.select(&rows).next() else {
        return Ok(false);
    };
    let headers: Vec<String> = first_row
        .select(&header)
        .map(|th| text_of(&th).to_lowercase())
        .collect();

    Ok(ASSESSMENT_HEADERS
        .iter()
        .all(|wanted| headers.iter().any(|h| h.contains(wanted))))
}

/// 解析课程考核页
///
/// 读取表头同时包含名称、总分、得分、布置日期四列的表格。
pub fn parse_assessments(document: &Html) -> Result<Vec<Assessment>> {
    let tables = selector("table")?;
    let rows = selector("tr")?;
    let cells = selector("td")?;

    let mut assessments = Vec::new();

    for table in document.select(&tables) {
        if !is_assessment_table(&table)? {
            continue;
        }

        for row in table.select(&rows).skip(1) {
            let values: Vec<String> = row.select(&cells).map(|td| text_of(&td)).collect();
            if values.len() < 4 || values[0].is_empty() {
                continue;
            }

            assessments.push(Assessment {
                name: values[0].clone(),
                total_marks: values[1].parse().unwrap_or(0.0),
                obtained_marks: values[2].parse().unwrap_or(0.0),
                assigned_date: values[3].clone(),
            });
        }
    }

    Ok(assessments)
}

// ===== Hidden State =====

/// 报表回发所需的隐藏字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenState {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

fn hidden_value(document: &Html, name: &str) -> Result<String> {
    let sel = selector(&format!("input[name='{name}']"))?;
    document
        .select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| AppError::Parsing(format!("hidden field {name} not found")))
}

/// 读取三个隐藏状态字段，任一缺失即失败
pub fn extract_hidden_state(document: &Html) -> Result<HiddenState> {
    Ok(HiddenState {
        view_state: hidden_value(document, "__VIEWSTATE")?,
        view_state_generator: hidden_value(document, "__VIEWSTATEGENERATOR")?,
        event_validation: hidden_value(document, "__EVENTVALIDATION")?,
    })
}
