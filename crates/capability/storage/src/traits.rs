//! 存储接口 Trait 定义
//!
//! 使用 async_trait 支持 `Arc<dyn ...>` 动态分发。

use crate::error::StorageError;
use async_trait::async_trait;
use domain::{FieldValue, Point};

/// 单个字段的最新值。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    pub device: String,
    pub field: String,
    pub value: FieldValue,
    pub ts_ms: i64,
}

/// 历史点写入接口。
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<(), StorageError>;
}

/// 最新值接口。
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// 用点内每个字段覆盖该设备的最新值。
    ///
    /// 时间戳早于已存值的字段不覆盖（乱序到达的报文不回退最新值）。
    async fn upsert_last_fields(&self, point: &Point) -> Result<(), StorageError>;

    async fn get_last_field(
        &self,
        device: &str,
        field: &str,
    ) -> Result<Option<FieldSample>, StorageError>;
}
