//! 解析模块
//!
//! 报表页面先被展平为文本 token 流，再由纯函数解析器按位置重建记录。
//! 除 `tokens`/`pages` 读取 HTML 外，解析器不依赖任何 I/O。

pub mod attendance;
pub mod html;
pub mod pages;
pub mod profile;
pub mod semester;
pub mod tokens;
pub mod transcript;

pub use attendance::{AttendanceDiagnostics, AttendanceParse, parse_attendance};
pub use semester::{Season, SemesterKey, order_semesters};
pub use tokens::{TokenStream, extract_tokens};
pub use transcript::{TranscriptDiagnostics, TranscriptParse, TranscriptTally, parse_transcript};
