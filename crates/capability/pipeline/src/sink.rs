use async_trait::async_trait;
use devhub_storage::{MeasurementStore, RealtimeStore, StorageError};
use domain::Point;
use std::sync::Arc;
use std::time::Duration;

/// 点写入错误。
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink write timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 点写入边界。
#[async_trait]
pub trait PointSink: Send + Sync {
    async fn write(&self, point: &Point) -> Result<(), SinkError>;
}

/// 基于存储层的写入器（历史点 + 最新值），整体受单一超时约束。
#[derive(Clone)]
pub struct StoragePointSink {
    measurement_store: Arc<dyn MeasurementStore>,
    realtime_store: Arc<dyn RealtimeStore>,
    timeout: Duration,
}

impl StoragePointSink {
    pub fn new(
        measurement_store: Arc<dyn MeasurementStore>,
        realtime_store: Arc<dyn RealtimeStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            measurement_store,
            realtime_store,
            timeout,
        }
    }
}

#[async_trait]
impl PointSink for StoragePointSink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let write = async {
            self.measurement_store.write_point(point).await?;
            self.realtime_store.upsert_last_fields(point).await?;
            Ok::<(), SinkError>(())
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devhub_storage::{FieldSample, InMemoryMeasurementStore, InMemoryRealtimeStore};
    use domain::FieldValue;

    struct StalledRealtime;

    #[async_trait]
    impl RealtimeStore for StalledRealtime {
        async fn upsert_last_fields(&self, _point: &Point) -> Result<(), StorageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn get_last_field(
            &self,
            _device: &str,
            _field: &str,
        ) -> Result<Option<FieldSample>, StorageError> {
            Ok(None)
        }
    }

    fn point() -> Point {
        Point::new("em-1", "shelly", "power_meter", 1000).with_field("Power", FieldValue::F64(1.0))
    }

    #[tokio::test]
    async fn writes_history_and_latest_value() {
        let measurements = Arc::new(InMemoryMeasurementStore::new());
        let realtime = Arc::new(InMemoryRealtimeStore::new());
        let sink = StoragePointSink::new(measurements.clone(), realtime.clone(), Duration::from_secs(1));
        sink.write(&point()).await.expect("write");
        assert_eq!(measurements.len(), 1);
        assert!(
            realtime
                .get_last_field("em-1", "Power")
                .await
                .expect("get")
                .is_some()
        );
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let sink = StoragePointSink::new(
            Arc::new(InMemoryMeasurementStore::new()),
            Arc::new(StalledRealtime),
            Duration::from_millis(50),
        );
        let err = sink.write(&point()).await.expect_err("timeout");
        assert!(matches!(err, SinkError::Timeout(_)));
    }
}
