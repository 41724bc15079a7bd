//! 课程数据模型
//!
//! 课程列表中的课程，以及按需加载的考勤与考核记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单次课堂考勤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    /// 课次编号
    pub lecture_number: u32,
    /// 上课日期（门户原文）
    pub lecture_date: String,
    /// 是否出勤
    pub present: bool,
    /// 授课教师
    pub faculty: String,
}

/// 考核记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub name: String,
    pub obtained_marks: f32,
    pub total_marks: f32,
    pub assigned_date: String,
}

/// 课程考勤汇总
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub records: Vec<Attendance>,
    pub total_lectures: u32,
    pub percentage: u32,
}

/// 课程
///
/// `id` 由门户分配，是会话内所有按课程查询的键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    pub credit_hours: String,
    pub course_type: String,
    pub faculty_name: String,
    pub faculty_email: String,
    pub mode: String,
    pub section: String,
    pub semester: String,

    /// === 考勤（首次抓取后才有意义）===
    pub total_lectures: u32,
    pub attendance_percentage: u32,
    pub attendance: Vec<Attendance>,
    pub attendance_synced_at: Option<DateTime<Utc>>,

    /// === 考核 ===
    pub assessments: Vec<Assessment>,
}

impl Course {
    /// 考勤是否至少抓取过一次
    pub fn attendance_loaded(&self) -> bool {
        self.attendance_synced_at.is_some()
    }

    /// 写入一次考勤抓取结果
    pub fn apply_attendance(&mut self, summary: AttendanceSummary) {
        self.total_lectures = summary.total_lectures;
        self.attendance_percentage = summary.percentage;
        self.attendance = summary.records;
        self.attendance_synced_at = Some(Utc::now());
    }

    /// 已出勤课次
    pub fn lectures_attended(&self) -> usize {
        self.attendance.iter().filter(|a| a.present).count()
    }

    /// 考核得分合计 (obtained, total)
    pub fn assessment_totals(&self) -> (f32, f32) {
        self.assessments.iter().fold((0.0, 0.0), |(obtained, total), a| {
            (obtained + a.obtained_marks, total + a.total_marks)
        })
    }
}
