//! 学生聚合

use serde::{Deserialize, Serialize};

use crate::models::course::Course;
use crate::models::transcript::Transcript;

/// 学生
///
/// 门户首页抓取的档案字段，加上课程列表和成绩单。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Student {
    pub name: String,
    pub batch: String,
    pub id: String,
    pub program: String,
    pub program_level: String,
    pub email: String,

    pub current_semester: String,
    pub cgpa_earned: String,

    /// === 学分计数 ===
    pub max_allowed_credit_hours: String,
    pub requested_credit_hours: String,
    pub completed_credit_hours: String,
    pub required_credit_hours: String,

    pub courses: Vec<Course>,
    pub transcript: Transcript,
}

impl Student {
    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    pub fn course_mut(&mut self, course_id: &str) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id == course_id)
    }
}
