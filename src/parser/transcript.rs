//! 成绩单解析
//!
//! 单次遍历整个 token 流，按优先级分派每个 token：
//! 1. 列标题 → 跳过
//! 2. 含季节名 → 结束上一学期，开始新学期
//! 3. "Cr. Hrs. Earned:" → 学期学分与 CGPA
//! 4. "SGPA:" → 学期 SGPA
//! 5. 否则尝试从当前位置读取一行课程，失败则前进 1 个 token 重新同步

use tracing::warn;

use crate::models::transcript::{Semester, Transcript, TranscriptCourse};

const COLUMN_HEADERS: [&str; 5] = ["Course Code", "Course Title", "Cr. Hrs", "Grade", "G.P."];
const SEASONS: [&str; 3] = ["Fall", "Spring", "Summer"];
const EARNED_LABEL: &str = "Cr. Hrs. Earned:";
const CGPA_LABEL: &str = "CGPA:";
const SGPA_LABEL: &str = "SGPA:";
const REPEAT_MARKER: &str = "[R]";

/// 不计绩点的成绩
pub const ZERO_POINT_GRADES: [&str; 7] = ["P", "I", "W", "SA", "S", "NC", "F"];

/// 解析过程中的累计值
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TranscriptTally {
    pub credit_hours_earned: u32,
    pub credit_hours_for_gpa: u32,
    pub total_grade_points: f32,
}

/// 重新同步时跳过的 token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptDiagnostics {
    pub skipped_tokens: Vec<String>,
}

/// 成绩单解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptParse {
    /// 已按时间顺序重排的学期映射，累计字段为空
    pub transcript: Transcript,
    pub tally: TranscriptTally,
    pub diagnostics: TranscriptDiagnostics,
}

/// 报表 span 中的四项累计值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptTotals {
    pub credit_hours_earned: Option<String>,
    pub credit_hours_for_gpa: Option<String>,
    pub total_grade_points: Option<String>,
    pub total_cgpa: Option<String>,
}

impl TranscriptTotals {
    /// 写入成绩单；缺失项使用解析累计值
    pub fn apply(self, transcript: &mut Transcript, tally: &TranscriptTally) {
        transcript.credit_hours_earned = self
            .credit_hours_earned
            .unwrap_or_else(|| tally.credit_hours_earned.to_string());
        transcript.credit_hours_for_gpa = self
            .credit_hours_for_gpa
            .unwrap_or_else(|| tally.credit_hours_for_gpa.to_string());
        transcript.total_grade_points = self
            .total_grade_points
            .unwrap_or_else(|| format!("{:.2}", tally.total_grade_points));
        transcript.total_cgpa = self.total_cgpa.unwrap_or_default();
    }
}

/// 从 span 文本序列中读取累计值：标签后的下一个 span 即数值
pub fn parse_totals(spans: &[String]) -> TranscriptTotals {
    let mut totals = TranscriptTotals::default();

    for (label, value) in spans.iter().zip(spans.iter().skip(1)) {
        let value = value.trim();
        match label.trim() {
            "Credit Hours Earned :" => totals.credit_hours_earned = Some(value.to_string()),
            "Credit Hours for GPA :" => totals.credit_hours_for_gpa = Some(value.to_string()),
            "Total Grade Points :" => totals.total_grade_points = Some(value.to_string()),
            "CGPA :" => {
                let cgpa = value.split(" /").next().unwrap_or(value);
                totals.total_cgpa = Some(cgpa.trim().to_string());
            }
            _ => {}
        }
    }

    totals
}

pub fn is_zero_point_grade(grade: &str) -> bool {
    ZERO_POINT_GRADES.contains(&grade)
}

fn is_column_header(token: &str) -> bool {
    COLUMN_HEADERS.contains(&token)
}

fn names_season(token: &str) -> bool {
    SEASONS.iter().any(|season| token.contains(season))
}

/// 前瞻 token 是否可作为绩点
fn grade_point_at(tokens: &[String], index: usize) -> Option<f32> {
    let token = tokens.get(index)?.trim();
    if token.contains(EARNED_LABEL) || names_season(token) || token.contains("Course Code") {
        return None;
    }
    token.parse().ok()
}

/// 正在累积的学期
#[derive(Default)]
struct Accumulator {
    semester: Semester,
    courses: Vec<TranscriptCourse>,
}

impl Accumulator {
    /// 有名称且至少一门课程时写入成绩单
    fn flush_into(&mut self, transcript: &mut Transcript) {
        let semester = std::mem::take(&mut self.semester);
        let courses = std::mem::take(&mut self.courses);
        if !semester.name.is_empty() && !courses.is_empty() {
            transcript.insert(semester, courses);
        }
    }
}

/// 解析成绩单 token 流
pub fn parse_transcript(tokens: &[String]) -> TranscriptParse {
    let mut transcript = Transcript::default();
    let mut tally = TranscriptTally::default();
    let mut diagnostics = TranscriptDiagnostics::default();
    let mut current = Accumulator::default();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].trim();

        if is_column_header(token) {
            i += 1;
            continue;
        }

        if names_season(token) {
            current.flush_into(&mut transcript);
            current.semester = Semester::named(token);
            i += 1;
            continue;
        }

        if token.contains(EARNED_LABEL) {
            if let Some((hours, cgpa)) = token.split_once(CGPA_LABEL) {
                if let Ok(hours) = hours.replacen(EARNED_LABEL, "", 1).trim().parse::<u32>() {
                    current.semester.credit_hours_earned = hours;
                    tally.credit_hours_earned += hours;
                }
                if let Ok(cgpa) = cgpa.trim().parse() {
                    current.semester.cgpa = cgpa;
                }
            }
            i += 1;
            continue;
        }

        if token.contains(SGPA_LABEL) {
            if let Ok(sgpa) = token.replacen(SGPA_LABEL, "", 1).trim().parse() {
                current.semester.sgpa = sgpa;
            }
            i += 1;
            continue;
        }

        if let Some((course, consumed)) = course_row(tokens, i, &mut tally) {
            current.courses.push(course);
            i += consumed;
            continue;
        }

        diagnostics.skipped_tokens.push(token.to_string());
        i += 1;
    }
    current.flush_into(&mut transcript);

    transcript.rekey_chronologically();

    if !diagnostics.skipped_tokens.is_empty() {
        warn!(
            skipped = diagnostics.skipped_tokens.len(),
            first = %diagnostics.skipped_tokens[0],
            "transcript tokens skipped while resynchronising"
        );
    }

    TranscriptParse {
        transcript,
        tally,
        diagnostics,
    }
}

/// 从位置 `i` 读取一行课程，返回课程与消耗的 token 数
fn course_row(
    tokens: &[String],
    i: usize,
    tally: &mut TranscriptTally,
) -> Option<(TranscriptCourse, usize)> {
    if i + 3 >= tokens.len() {
        return None;
    }

    let code = tokens[i].trim();
    let title = tokens[i + 1].trim();
    let credit_hours: u32 = tokens[i + 2].trim().parse().ok()?;
    let grade = tokens[i + 3].trim();

    let mut grade_point = 0.0;
    let mut consumed = 4;

    if is_zero_point_grade(grade) {
        if grade == "F" && !title.contains(REPEAT_MARKER) {
            tally.credit_hours_for_gpa += credit_hours;
        }
    } else if let Some(gp) = grade_point_at(tokens, i + 4) {
        grade_point = gp;
        consumed = 5;
        if gp != 0.0 {
            tally.credit_hours_for_gpa += credit_hours;
        }
        if gp > 0.0 {
            tally.total_grade_points += gp;
        }
    }

    Some((
        TranscriptCourse {
            code: code.to_string(),
            title: title.to_string(),
            credit_hours,
            grade: grade.to_string(),
            grade_point,
        },
        consumed,
    ))
}
