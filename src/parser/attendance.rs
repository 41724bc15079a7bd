//! 课程考勤解析
//!
//! token 布局：
//! - 0..4 为表头标签，按位置跳过；
//! - 之后每 4 个为一组：课次（"Lecture No. N"）、日期、出勤、教师；
//! - 最后 2 个为汇总："Total Lectures : N" 与 "NN % Attendance"。

use tracing::warn;

use crate::models::course::{Attendance, AttendanceSummary};

const HEADER_TOKENS: usize = 4;
const TRAILER_TOKENS: usize = 2;
const GROUP_WIDTH: usize = 4;
const MIN_TOKENS: usize = 6;

const LECTURE_PREFIX: &str = "Lecture No. ";
const TOTAL_PREFIX: &str = "Total Lectures : ";
// The portal has shipped both spellings.
const PERCENT_SUFFIXES: [&str; 2] = [" % Attandence", " % Attendance"];

/// 解析过程中观察到的异常
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceDiagnostics {
    /// 课次无法解析而整组跳过的数量
    pub skipped_groups: usize,
    /// 不足一组、被丢弃的 token 数
    pub leftover_tokens: usize,
}

impl AttendanceDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped_groups == 0 && self.leftover_tokens == 0
    }
}

/// 考勤解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceParse {
    pub summary: AttendanceSummary,
    pub diagnostics: AttendanceDiagnostics,
}

/// 解析考勤 token 流
///
/// 少于 6 个 token 时返回空记录和零汇总，不视为错误。
pub fn parse_attendance(tokens: &[String]) -> AttendanceParse {
    if tokens.len() < MIN_TOKENS {
        return AttendanceParse::default();
    }

    let end = tokens.len() - TRAILER_TOKENS;
    let mut records = Vec::new();
    let mut diagnostics = AttendanceDiagnostics::default();

    let mut i = HEADER_TOKENS;
    while i + GROUP_WIDTH <= end {
        match parse_lecture_number(&tokens[i]) {
            Some(lecture_number) => records.push(Attendance {
                lecture_number,
                lecture_date: tokens[i + 1].clone(),
                present: tokens[i + 2].eq_ignore_ascii_case("Present"),
                faculty: tokens[i + 3].clone(),
            }),
            None => diagnostics.skipped_groups += 1,
        }
        i += GROUP_WIDTH;
    }
    diagnostics.leftover_tokens = end.saturating_sub(i);

    let total_lectures = parse_total_lectures(&tokens[end]);
    let percentage = parse_percentage(&tokens[end + 1]);

    if !diagnostics.is_clean() {
        warn!(
            skipped_groups = diagnostics.skipped_groups,
            leftover_tokens = diagnostics.leftover_tokens,
            token_count = tokens.len(),
            "attendance token stream does not follow the 4-token stride"
        );
    }

    AttendanceParse {
        summary: AttendanceSummary {
            records,
            total_lectures,
            percentage,
        },
        diagnostics,
    }
}

fn parse_lecture_number(token: &str) -> Option<u32> {
    token
        .strip_prefix(LECTURE_PREFIX)
        .unwrap_or(token)
        .parse()
        .ok()
}

fn parse_total_lectures(token: &str) -> u32 {
    token
        .strip_prefix(TOTAL_PREFIX)
        .unwrap_or(token)
        .parse()
        .unwrap_or(0)
}

/// 解析出勤百分比，两种拼写的后缀等价
pub fn parse_percentage(token: &str) -> u32 {
    let mut value = token;
    for suffix in PERCENT_SUFFIXES {
        value = value.strip_suffix(suffix).unwrap_or(value);
    }
    value.trim().parse().unwrap_or(0)
}
