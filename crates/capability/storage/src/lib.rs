//! # DevHub Storage 模块
//!
//! 规范化时序点的持久化：
//!
//! - [`MeasurementStore`]：历史点写入（Postgres / 内存）
//! - [`RealtimeStore`]：每个设备每个字段的最新值（Redis / 内存），读接口据此查询
//!
//! 两类存储互相独立，写入方（pipeline 的 sink）负责按顺序调用。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod redis;
pub mod traits;
pub mod value;

pub use connection::connect_pool;
pub use error::StorageError;
pub use in_memory::{DEFAULT_HISTORY_CAPACITY, InMemoryMeasurementStore, InMemoryRealtimeStore};
pub use postgres::PgMeasurementStore;
pub use crate::redis::RedisRealtimeStore;
pub use traits::{FieldSample, MeasurementStore, RealtimeStore};
pub use value::{field_from_json, field_to_json};
