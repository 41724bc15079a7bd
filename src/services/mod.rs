//! 服务模块

pub mod report;
pub mod session;

pub use report::{ReportFetcher, ReportRequest};
pub use session::Session;
