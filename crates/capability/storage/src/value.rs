//! FieldValue 与 JSON 之间的转换（Redis 存储与读接口共用）。

use domain::FieldValue;
use serde_json::{Number, Value};

/// 非有限浮点数没有 JSON 表示，转为 null。
pub fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::I64(v) => Value::from(*v),
        FieldValue::F64(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Bool(v) => Value::Bool(*v),
        FieldValue::String(v) => Value::String(v.clone()),
    }
}

pub fn field_from_json(value: Value) -> Option<FieldValue> {
    match value {
        Value::Bool(v) => Some(FieldValue::Bool(v)),
        Value::Number(number) => number
            .as_i64()
            .map(FieldValue::I64)
            .or_else(|| number.as_f64().map(FieldValue::F64)),
        Value::String(v) => Some(FieldValue::String(v)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
