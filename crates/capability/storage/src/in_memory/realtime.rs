use crate::error::StorageError;
use crate::traits::{FieldSample, RealtimeStore};
use domain::Point;
use std::collections::HashMap;
use std::sync::RwLock;

/// 最新值内存存储，键为 (device, field)。
#[derive(Default)]
pub struct InMemoryRealtimeStore {
    last_values: RwLock<HashMap<(String, String), FieldSample>>,
}

impl InMemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.last_values.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RealtimeStore for InMemoryRealtimeStore {
    async fn upsert_last_fields(&self, point: &Point) -> Result<(), StorageError> {
        let device = point
            .device()
            .ok_or_else(|| StorageError::new("point without device tag"))?;
        let mut values = self
            .last_values
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for (field, value) in &point.fields {
            let key = (device.to_string(), field.clone());
            if values.get(&key).is_some_and(|known| known.ts_ms > point.ts_ms) {
                continue;
            }
            values.insert(
                key,
                FieldSample {
                    device: device.to_string(),
                    field: field.clone(),
                    value: value.clone(),
                    ts_ms: point.ts_ms,
                },
            );
        }
        Ok(())
    }

    async fn get_last_field(
        &self,
        device: &str,
        field: &str,
    ) -> Result<Option<FieldSample>, StorageError> {
        let values = self
            .last_values
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(values.get(&(device.to_string(), field.to_string())).cloned())
    }
}
