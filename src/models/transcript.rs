//! 成绩单数据模型
//!
//! 学期 → 课程列表的映射，以及四项累计值。缓存形式中学期是数组，
//! 数值字段存为十进制字符串（GPA 保留两位小数），保证文本往返一致。

use serde::{Deserialize, Serialize};

use crate::parser::semester::{SemesterKey, order_semesters};

/// 成绩单中的一门课程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptCourse {
    pub code: String,
    pub title: String,
    pub credit_hours: u32,
    pub grade: String,
    pub grade_point: f32,
}

/// 学期
///
/// 作为映射键使用，按全部字段比较。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Semester {
    pub name: String,
    pub credit_hours_earned: u32,
    pub cgpa: f32,
    pub sgpa: f32,
}

impl Semester {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// 学期及其课程
#[derive(Debug, Clone, PartialEq)]
pub struct SemesterRecord {
    pub semester: Semester,
    pub courses: Vec<TranscriptCourse>,
}

/// 成绩单
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "TranscriptSnapshot", into = "TranscriptSnapshot")]
pub struct Transcript {
    /// 学期映射，键唯一
    pub semesters: Vec<SemesterRecord>,
    pub credit_hours_earned: String,
    pub credit_hours_for_gpa: String,
    pub total_grade_points: String,
    pub total_cgpa: String,
}

impl Transcript {
    /// 插入或替换某学期的课程列表
    pub fn insert(&mut self, semester: Semester, courses: Vec<TranscriptCourse>) {
        match self.semesters.iter_mut().find(|r| r.semester == semester) {
            Some(record) => record.courses = courses,
            None => self.semesters.push(SemesterRecord { semester, courses }),
        }
    }

    pub fn courses(&self, semester: &Semester) -> Option<&[TranscriptCourse]> {
        self.semesters
            .iter()
            .find(|r| &r.semester == semester)
            .map(|r| r.courses.as_slice())
    }

    pub fn len(&self) -> usize {
        self.semesters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.semesters.is_empty()
    }

    /// 按时间顺序排列的学期视图
    ///
    /// 名称无法解析为 (季节, 年份) 的学期不在视图中，但仍保留在映射里。
    pub fn ordered(&self) -> Vec<SemesterKey> {
        order_semesters(self.semesters.iter().map(|r| &r.semester))
    }

    /// 按时间顺序重排底层映射；无法解析的学期保持原有相对顺序排在最后
    pub fn rekey_chronologically(&mut self) {
        let order: Vec<Semester> = self.ordered().into_iter().map(|k| k.semester).collect();
        let mut remaining = std::mem::take(&mut self.semesters);
        let mut sorted = Vec::with_capacity(remaining.len());

        for semester in order {
            if let Some(pos) = remaining.iter().position(|r| r.semester == semester) {
                sorted.push(remaining.remove(pos));
            }
        }
        sorted.append(&mut remaining);
        self.semesters = sorted;
    }
}

// ===== Cache Snapshot =====

/// 缓存中的学期
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SemesterSnapshot {
    name: String,
    credit_hours_earned: String,
    cgpa: String,
    sgpa: String,
    courses: Vec<TranscriptCourse>,
}

/// 缓存中的成绩单
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranscriptSnapshot {
    semesters: Vec<SemesterSnapshot>,
    credit_hours_earned: String,
    credit_hours_for_gpa: String,
    total_grade_points: String,
    total_cgpa: String,
}

impl From<Transcript> for TranscriptSnapshot {
    fn from(transcript: Transcript) -> Self {
        let semesters = transcript
            .semesters
            .into_iter()
            .map(|record| SemesterSnapshot {
                name: record.semester.name,
                credit_hours_earned: record.semester.credit_hours_earned.to_string(),
                cgpa: format!("{:.2}", record.semester.cgpa),
                sgpa: format!("{:.2}", record.semester.sgpa),
                courses: record.courses,
            })
            .collect();

        TranscriptSnapshot {
            semesters,
            credit_hours_earned: transcript.credit_hours_earned,
            credit_hours_for_gpa: transcript.credit_hours_for_gpa,
            total_grade_points: transcript.total_grade_points,
            total_cgpa: transcript.total_cgpa,
        }
    }
}

impl From<TranscriptSnapshot> for Transcript {
    fn from(snapshot: TranscriptSnapshot) -> Self {
        let mut transcript = Transcript {
            semesters: Vec::with_capacity(snapshot.semesters.len()),
            credit_hours_earned: snapshot.credit_hours_earned,
            credit_hours_for_gpa: snapshot.credit_hours_for_gpa,
            total_grade_points: snapshot.total_grade_points,
            total_cgpa: snapshot.total_cgpa,
        };

        // Unparsable numbers fall back to zero, same as a fresh semester.
        for sem in snapshot.semesters {
            let semester = Semester {
                name: sem.name,
                credit_hours_earned: sem.credit_hours_earned.trim().parse().unwrap_or(0),
                cgpa: sem.cgpa.trim().parse().unwrap_or(0.0),
                sgpa: sem.sgpa.trim().parse().unwrap_or(0.0),
            };
            transcript.insert(semester, sem.courses);
        }

        transcript
    }
}
