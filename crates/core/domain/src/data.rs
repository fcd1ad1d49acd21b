use std::collections::BTreeMap;

/// 所有设备点共用的 measurement 名称。
pub const MEASUREMENT: &str = "devices";

/// 订阅层投递的原始报文。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at_ms: i64,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, received_at_ms: i64) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at_ms,
        }
    }
}

/// 字段值（不同设备族字段类型不一）。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

impl FieldValue {
    /// 数值字段转为 f64，字符串字段返回 None。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::I64(v) => Some(*v as f64),
            FieldValue::F64(v) => Some(*v),
            FieldValue::Bool(_) | FieldValue::String(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::I64(v) => write!(f, "{}", v),
            FieldValue::F64(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// 规范化后的时序点。
///
/// tags 仅放低基数的索引元数据（device/source/type 等），测量值一律放 fields。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub ts_ms: i64,
}

impl Point {
    /// 以固定 measurement 创建点，并写入 device/source/type 三个基础 tag。
    pub fn new(device: &str, source: &str, kind: &str, ts_ms: i64) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("device".to_string(), device.to_string());
        tags.insert("source".to_string(), source.to_string());
        tags.insert("type".to_string(), kind.to_string());
        Self {
            measurement: MEASUREMENT.to_string(),
            tags,
            fields: BTreeMap::new(),
            ts_ms,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn device(&self) -> Option<&str> {
        self.tags.get("device").map(String::as_str)
    }
}
