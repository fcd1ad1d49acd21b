//! 设备目录：注册中心设备列表的本地缓存。
//!
//! 尽力而为、最终一致。refresh 期间读者看到的是上一次的快照；
//! 基于旧快照判定“未知设备”可能导致并发重复注册，这是允许的。

use crate::{DeviceRegistry, RegistryError};
use devhub_telemetry::{record_directory_refresh, record_directory_refresh_failure};
use domain::Device;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

#[derive(Default)]
struct Snapshot {
    devices: Vec<Device>,
    serials: HashSet<String>,
}

impl Snapshot {
    fn from_devices(devices: Vec<Device>) -> Self {
        let serials = devices.iter().map(|device| device.serial.clone()).collect();
        Self { devices, serials }
    }
}

/// 设备目录。
pub struct DeviceDirectory {
    registry: Arc<dyn DeviceRegistry>,
    snapshot: RwLock<Snapshot>,
}

impl DeviceDirectory {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self {
            registry,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// 从注册中心拉取全量设备并替换缓存。
    pub async fn refresh(&self) -> Result<Vec<Device>, RegistryError> {
        let devices = match self.registry.list_all_devices().await {
            Ok(devices) => devices,
            Err(err) => {
                record_directory_refresh_failure();
                warn!(target: "devhub.registry", error = %err, "directory_refresh_failed");
                return Err(err);
            }
        };
        record_directory_refresh();
        info!(target: "devhub.registry", devices = devices.len(), "directory_refreshed");
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = Snapshot::from_devices(devices.clone());
        Ok(devices)
    }

    /// 是否为已知设备（基于最近一次快照）。
    pub fn contains(&self, serial: &str) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .serials
            .contains(serial)
    }

    /// 所有已知设备的 topic（去重，保持设备顺序）。
    pub fn topics_for_all(&self) -> Vec<String> {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        let mut topics = Vec::new();
        for topic in snapshot.devices.iter().flat_map(|device| device.topics.iter()) {
            if seen.insert(topic.as_str()) {
                topics.push(topic.clone());
            }
        }
        topics
    }

    /// 注册成功后把设备记入本地快照，下一次 refresh 前即可命中。
    pub fn remember(&self, device: Device) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.serials.insert(device.serial.clone()) {
            snapshot.devices.push(device);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .devices
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
