//! 核心数据模型模块
//!
//! 定义门户抽取结果的数据结构：Student, Course, Transcript 等。

pub mod course;
pub mod credentials;
pub mod student;
pub mod transcript;

pub use course::{Assessment, Attendance, AttendanceSummary, Course};
pub use credentials::Credentials;
pub use student::Student;
pub use transcript::{Semester, SemesterRecord, Transcript, TranscriptCourse};
