//! 报文分类与解码：(topic, payload) → 规范化时序点。
//!
//! 纯计算，无 IO。分类规则按固定优先级依次匹配，第一个命中的规则决定解码器，
//! 优先级本身是对外契约（见 `classify`）。

mod classify;
mod decode;

use domain::{InboundMessage, Point};

pub use classify::{MessageKind, classify, family_hint};
pub use decode::{METER_FIELDS, decode};

/// 解码错误：报文被丢弃，不影响后续报文。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid numeric payload: {0:?}")]
    InvalidNumber(String),
    #[error("unsupported meter field: {0}")]
    UnsupportedField(String),
    #[error("invalid json payload: {0}")]
    InvalidJson(String),
    #[error("payload carries no usable fields")]
    EmptyFields,
}

/// 分类并解码一条报文。
pub fn normalize(device_id: &str, message: &InboundMessage) -> Result<(MessageKind, Point), DecodeError> {
    let kind = classify(&message.topic, &message.payload);
    let point = decode(kind, device_id, message)?;
    Ok((kind, point))
}
