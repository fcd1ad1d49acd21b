//! 单条报文的分发状态机：
//! `Received → DeviceResolved → (KnownDevice | RegisteringDevice) → Classified → PointEmitted | Dropped`
//!
//! 报文之间无共享状态；并发调用之间只共享设备目录与凭据会话。

use crate::sink::PointSink;
use devhub_normalize::{DecodeError, MessageKind, classify, decode, family_hint};
use devhub_registry::{DeviceDirectory, DeviceRegistration, DeviceRegistry, RegisterOutcome};
use domain::{Device, InboundMessage, device_id_from_topic};
use std::sync::Arc;
use tracing::{debug, warn};

/// 解码失败时随报告携带的原始 payload 上限（字节）。
pub const PAYLOAD_PREVIEW_LIMIT: usize = 256;

/// 设备在本次分发中的注册情况。
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStatus {
    /// 目录中已存在。
    Known,
    Registered,
    /// 注册中心报告序列号已存在，视为成功。
    AlreadyRegistered,
    /// 注册失败；报文仍继续解码写入。
    Failed(String),
}

/// 分发结果。
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Written { kind: MessageKind, fields: usize },
    /// topic 无法提取设备标识，静默丢弃。
    DroppedUnknownTopic,
    /// `payload` 为原始报文的有损 UTF-8 预览，最长 [`PAYLOAD_PREVIEW_LIMIT`] 字节。
    DroppedDecode {
        kind: MessageKind,
        error: DecodeError,
        payload: String,
    },
    DroppedSink(String),
}

/// 一条报文的处理报告。
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub topic: String,
    pub payload_len: usize,
    pub device_id: Option<String>,
    pub registration: Option<RegistrationStatus>,
    pub outcome: DispatchOutcome,
}

/// 报文分发器。
pub struct Dispatcher {
    directory: Arc<DeviceDirectory>,
    registry: Arc<dyn DeviceRegistry>,
    sink: Arc<dyn PointSink>,
    default_owner: i64,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<DeviceDirectory>,
        registry: Arc<dyn DeviceRegistry>,
        sink: Arc<dyn PointSink>,
        default_owner: i64,
    ) -> Self {
        Self {
            directory,
            registry,
            sink,
            default_owner,
        }
    }

    pub async fn dispatch(&self, message: InboundMessage) -> DispatchReport {
        let mut report = DispatchReport {
            topic: message.topic.clone(),
            payload_len: message.payload.len(),
            device_id: None,
            registration: None,
            outcome: DispatchOutcome::DroppedUnknownTopic,
        };
        let Some(device_id) = device_id_from_topic(&message.topic) else {
            return report;
        };
        report.device_id = Some(device_id.to_string());
        report.registration = Some(self.ensure_registered(device_id, &message.topic).await);

        let kind = classify(&message.topic, &message.payload);
        let point = match decode(kind, device_id, &message) {
            Ok(point) => point,
            Err(error) => {
                report.outcome = DispatchOutcome::DroppedDecode {
                    kind,
                    error,
                    payload: payload_preview(&message.payload),
                };
                return report;
            }
        };
        report.outcome = match self.sink.write(&point).await {
            Ok(()) => DispatchOutcome::Written {
                kind,
                fields: point.fields.len(),
            },
            Err(err) => DispatchOutcome::DroppedSink(err.to_string()),
        };
        report
    }

    async fn ensure_registered(&self, device_id: &str, topic: &str) -> RegistrationStatus {
        if self.directory.contains(device_id) {
            return RegistrationStatus::Known;
        }
        // 目录可能落后于注册中心，先刷新再判定；刷新失败则按旧视图继续
        if let Err(err) = self.directory.refresh().await {
            debug!(target: "devhub.ingest", device = %device_id, error = %err, "directory_stale_view");
        }
        if self.directory.contains(device_id) {
            return RegistrationStatus::Known;
        }

        let family = family_hint(topic);
        let registration = DeviceRegistration {
            serial: device_id.to_string(),
            description: format!("Auto-registered from topic {}", topic),
            family,
            owner: self.default_owner,
        };
        match self.registry.register_device(&registration).await {
            Ok(outcome) => {
                let mut topics = family.topic_templates(device_id);
                if !topics.iter().any(|known| known == topic) {
                    topics.push(topic.to_string());
                }
                self.directory.remember(Device {
                    serial: registration.serial,
                    topics,
                    family: Some(family),
                    owner: Some(registration.owner),
                    description: Some(registration.description),
                });
                match outcome {
                    RegisterOutcome::Created => RegistrationStatus::Registered,
                    RegisterOutcome::AlreadyExists => RegistrationStatus::AlreadyRegistered,
                }
            }
            Err(err) => {
                warn!(
                    target: "devhub.registry",
                    device = %device_id,
                    family = %family,
                    error = %err,
                    "device_registration_failed"
                );
                RegistrationStatus::Failed(err.to_string())
            }
        }
    }
}

/// 截断到上限后按有损 UTF-8 解码；截断点落在多字节字符中间时该字符变为替换符。
pub fn payload_preview(payload: &[u8]) -> String {
    let end = payload.len().min(PAYLOAD_PREVIEW_LIMIT);
    let mut preview = String::from_utf8_lossy(&payload[..end]).into_owned();
    if payload.len() > end {
        preview.push('…');
    }
    preview
}
