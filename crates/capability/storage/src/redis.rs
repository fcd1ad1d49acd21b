//! Redis 最新值实现
//!
//! 每个设备一个 hash：`device:{device}:last`，field 为字段名，
//! value 为 `{"ts_ms":..,"value":..}` JSON。写入经 Lua 脚本原子比较时间戳，旧点不覆盖新值。

use crate::error::StorageError;
use crate::traits::{FieldSample, RealtimeStore};
use crate::value::{field_from_json, field_to_json};
use domain::Point;
use redis::AsyncCommands;

#[derive(serde::Serialize, serde::Deserialize)]
struct LastFieldPayload {
    ts_ms: i64,
    value: serde_json::Value,
}

// KEYS[1] = hash；ARGV = ts_ms, ttl(0 为不过期), 然后 field/payload 成对出现。
// 逐字段比较已存 ts_ms，只覆盖不比自己新的值；整个脚本在 Redis 内原子执行。
const UPSERT_LAST_FIELDS: &str = r#"
local ts = tonumber(ARGV[1])
local ttl = tonumber(ARGV[2])
local written = 0
for i = 3, #ARGV, 2 do
  local current = redis.call('HGET', KEYS[1], ARGV[i])
  local keep = false
  if current then
    local ok, decoded = pcall(cjson.decode, current)
    if ok and type(decoded) == 'table' and tonumber(decoded.ts_ms) and tonumber(decoded.ts_ms) > ts then
      keep = true
    end
  end
  if not keep then
    redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
    written = written + 1
  end
end
if written > 0 and ttl > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return written
"#;

fn last_fields_key(device: &str) -> String {
    format!("device:{}:last", device)
}

/// 每个字段编码为 `(field, {"ts_ms":..,"value":..})`。
fn encode_fields(point: &Point) -> Result<Vec<(String, String)>, StorageError> {
    point
        .fields
        .iter()
        .map(|(name, value)| {
            let payload = LastFieldPayload {
                ts_ms: point.ts_ms,
                value: field_to_json(value),
            };
            Ok((name.clone(), serde_json::to_string(&payload)?))
        })
        .collect()
}

/// Redis 最新值存储
pub struct RedisRealtimeStore {
    client: redis::Client,
    last_value_ttl_seconds: Option<u64>,
    upsert: redis::Script,
}

impl RedisRealtimeStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            last_value_ttl_seconds: None,
            upsert: redis::Script::new(UPSERT_LAST_FIELDS),
        }
    }

    /// TTL 为 0 视为不过期。
    pub fn connect_with_ttl(
        redis_url: &str,
        last_value_ttl_seconds: Option<u64>,
    ) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            last_value_ttl_seconds: last_value_ttl_seconds.filter(|ttl| *ttl > 0),
            ..Self::new(client)
        })
    }
}

#[async_trait::async_trait]
impl RealtimeStore for RedisRealtimeStore {
    async fn upsert_last_fields(&self, point: &Point) -> Result<(), StorageError> {
        let device = point
            .device()
            .ok_or_else(|| StorageError::new("point without device tag"))?;
        if point.fields.is_empty() {
            return Ok(());
        }
        let fields = encode_fields(point)?;
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let mut invocation = self.upsert.key(last_fields_key(device));
        invocation
            .arg(point.ts_ms)
            .arg(self.last_value_ttl_seconds.unwrap_or(0));
        for (name, payload) in &fields {
            invocation.arg(name).arg(payload);
        }
        let _written: i64 = invocation.invoke_async(&mut connection).await?;
        Ok(())
    }

    async fn get_last_field(
        &self,
        device: &str,
        field: &str,
    ) -> Result<Option<FieldSample>, StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        let data: Option<String> = connection.hget(last_fields_key(device), field).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let payload: LastFieldPayload = serde_json::from_str(&data)?;
        let Some(value) = field_from_json(payload.value) else {
            return Ok(None);
        };
        Ok(Some(FieldSample {
            device: device.to_string(),
            field: field.to_string(),
            value,
            ts_ms: payload.ts_ms,
        }))
    }
}
