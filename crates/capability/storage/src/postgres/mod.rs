//! # PostgreSQL 存储实现模块
//!
//! 依赖表 `device_points`（见 [`PgMeasurementStore::ensure_schema`]）：
//! 每行一个时序点，tags/fields 以 jsonb 保存，按 (device, ts) 建索引。

pub mod measurement;

pub use measurement::*;
