//! 内存存储实现
//!
//! 未配置数据库/Redis 时的开发模式，以及测试使用。

pub mod measurement;
pub mod realtime;

pub use measurement::*;
pub use realtime::*;
