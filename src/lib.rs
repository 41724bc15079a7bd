//! UMT Portal - 学生门户学业记录抽取
//!
//! 登录 UMT 学生门户，复现报表查看器的隐藏状态回发协议，并把报表展平后的
//! 文本 token 流解析为课程、考勤、考核和成绩单记录。

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod parser;
pub mod security;
pub mod services;
pub mod storage;

pub use api::Portal;
pub use error::{AppError, ErrorCode, Result, StatusReply};
