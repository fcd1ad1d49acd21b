use crate::DecodeError;
use crate::classify::{MessageKind, meter_channel, relay_channel};
use chrono::DateTime;
use domain::{FieldValue, InboundMessage, Point};
use serde::Deserialize;
use serde_json::{Map, Value};

/// 电表通道允许的字段名（topic 最后一段）。
pub const METER_FIELDS: [&str; 8] = [
    "power",
    "energy",
    "voltage",
    "current",
    "total",
    "total_returned",
    "reactive_power",
    "pf",
];

/// 按类别解码为单个时序点。
///
/// 除 SENSOR 报文自带合法 RFC 3339 时间外，时间戳一律取接收时间。
pub fn decode(kind: MessageKind, device_id: &str, message: &InboundMessage) -> Result<Point, DecodeError> {
    let point = match kind {
        MessageKind::PowerMeter => decode_power_meter(device_id, message)?,
        MessageKind::Relay => decode_relay(device_id, message),
        MessageKind::State => decode_state(device_id, message)?,
        MessageKind::Sensor => decode_sensor(device_id, message)?,
        MessageKind::MeshSensor => {
            let fields = json_object_fields(&message.payload)?;
            with_fields(
                Point::new(device_id, "zigbee2mqtt", "sensor", message.received_at_ms),
                fields,
            )
        }
        MessageKind::GenericJson => {
            let fields = json_object_fields(&message.payload)?;
            with_fields(
                Point::new(device_id, "generic", "auto_detected", message.received_at_ms),
                fields,
            )
        }
        MessageKind::GenericScalar => decode_scalar(device_id, message),
    };
    if point.fields.is_empty() {
        return Err(DecodeError::EmptyFields);
    }
    Ok(point)
}

fn decode_power_meter(device_id: &str, message: &InboundMessage) -> Result<Point, DecodeError> {
    let (channel, field) = meter_channel(&message.topic)
        .ok_or_else(|| DecodeError::UnsupportedField(message.topic.clone()))?;
    if !METER_FIELDS.contains(&field) {
        return Err(DecodeError::UnsupportedField(field.to_string()));
    }
    let text = String::from_utf8_lossy(&message.payload);
    let value = text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| DecodeError::InvalidNumber(text.to_string()))?;
    Ok(
        Point::new(device_id, "shelly", "power_meter", message.received_at_ms)
            .with_tag("channel", channel)
            .with_field(capitalize(field), FieldValue::F64(value)),
    )
}

fn decode_relay(device_id: &str, message: &InboundMessage) -> Point {
    let channel = relay_channel(&message.topic).unwrap_or("0");
    let text = String::from_utf8_lossy(&message.payload);
    let state = if text.trim().eq_ignore_ascii_case("on") { 1 } else { 0 };
    Point::new(device_id, "shelly", "relay", message.received_at_ms)
        .with_tag("channel", channel)
        .with_field("state", FieldValue::I64(state))
}

#[derive(Deserialize)]
struct StatePayload {
    #[serde(rename = "POWER")]
    power: Option<String>,
    #[serde(rename = "RSSI")]
    rssi: Option<i64>,
    #[serde(rename = "Wifi")]
    wifi: Option<WifiBlock>,
}

#[derive(Deserialize)]
struct WifiBlock {
    #[serde(rename = "RSSI")]
    rssi: Option<i64>,
}

fn decode_state(device_id: &str, message: &InboundMessage) -> Result<Point, DecodeError> {
    let state: StatePayload = parse_json(&message.payload)?;
    let mut point = Point::new(device_id, "nousat", "state", message.received_at_ms);
    if let Some(power) = state.power {
        point = point.with_field("POWER", FieldValue::String(power));
    }
    // 顶层 RSSI 优先，固件较新时只在 Wifi 块内上报
    if let Some(rssi) = state.rssi.or(state.wifi.and_then(|wifi| wifi.rssi)) {
        point = point.with_field("RSSI", FieldValue::I64(rssi));
    }
    Ok(point)
}

#[derive(Deserialize)]
struct SensorPayload {
    #[serde(rename = "Time")]
    time: Option<String>,
    #[serde(rename = "ENERGY")]
    energy: EnergyBlock,
}

#[derive(Deserialize)]
struct EnergyBlock {
    #[serde(rename = "Total")]
    total: Option<f64>,
    #[serde(rename = "Power")]
    power: Option<f64>,
    #[serde(rename = "Voltage")]
    voltage: Option<f64>,
    #[serde(rename = "Current")]
    current: Option<f64>,
}

fn decode_sensor(device_id: &str, message: &InboundMessage) -> Result<Point, DecodeError> {
    let sensor: SensorPayload = parse_json(&message.payload)?;
    let ts_ms = sensor
        .time
        .as_deref()
        .and_then(parse_rfc3339_ms)
        .unwrap_or(message.received_at_ms);
    let energy = sensor.energy;
    let mut point = Point::new(device_id, "nousat", "energy", ts_ms);
    for (name, value) in [
        ("Total", energy.total),
        ("Power", energy.power),
        ("Voltage", energy.voltage),
        ("Current", energy.current),
    ] {
        if let Some(value) = value {
            point = point.with_field(name, FieldValue::F64(value));
        }
    }
    Ok(point)
}

fn decode_scalar(device_id: &str, message: &InboundMessage) -> Point {
    let text = String::from_utf8_lossy(&message.payload);
    let value = match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => FieldValue::F64(number),
        _ => FieldValue::String(text.into_owned()),
    };
    Point::new(device_id, "generic", "auto_detected", message.received_at_ms).with_field("value", value)
}

fn parse_json<T: for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|err| DecodeError::InvalidJson(err.to_string()))
}

fn json_object_fields(payload: &[u8]) -> Result<Vec<(String, FieldValue)>, DecodeError> {
    let object: Map<String, Value> = parse_json(payload)?;
    Ok(object
        .into_iter()
        .filter_map(|(key, value)| json_field(value).map(|value| (key, value)))
        .collect())
}

// 整数保持 i64，其余数值为 f64；null 丢弃；嵌套结构以 JSON 文本保存
fn json_field(value: Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(FieldValue::Bool(flag)),
        Value::Number(number) => number
            .as_i64()
            .map(FieldValue::I64)
            .or_else(|| number.as_f64().map(FieldValue::F64)),
        Value::String(text) => Some(FieldValue::String(text)),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(FieldValue::String(nested.to_string())),
    }
}

fn with_fields(point: Point, fields: Vec<(String, FieldValue)>) -> Point {
    fields
        .into_iter()
        .fold(point, |point, (key, value)| point.with_field(key, value))
}

fn parse_rfc3339_ms(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.timestamp_millis())
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
