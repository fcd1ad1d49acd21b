use crate::error::StorageError;
use crate::traits::MeasurementStore;
use domain::Point;
use std::collections::VecDeque;
use std::sync::RwLock;

/// 默认保留的历史点数量。
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// 历史点内存存储
///
/// 定长环形缓冲：超过容量时淘汰最早写入的点。
pub struct InMemoryMeasurementStore {
    points: RwLock<VecDeque<Point>>,
    capacity: usize,
}

impl Default for InMemoryMeasurementStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl InMemoryMeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 容量至少为 1。
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 获取当前保留的点数量（用于测试）
    pub fn len(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 某设备仍保留的点，按写入顺序。
    pub fn points_for(&self, device: &str) -> Vec<Point> {
        self.points
            .read()
            .map(|points| {
                points
                    .iter()
                    .filter(|point| point.device() == Some(device))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl MeasurementStore for InMemoryMeasurementStore {
    async fn write_point(&self, point: &Point) -> Result<(), StorageError> {
        let mut points = self
            .points
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if points.len() >= self.capacity {
            points.pop_front();
        }
        points.push_back(point.clone());
        Ok(())
    }
}
