//! 对外接口模块
//!
//! 展示层只通过 [`Portal`] 访问门户：粗粒度状态码加简短消息，不传递错误链。

pub mod portal;

pub use portal::Portal;
