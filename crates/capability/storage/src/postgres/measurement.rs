//! Postgres 时序写入实现

use crate::error::StorageError;
use crate::traits::MeasurementStore;
use crate::value::field_to_json;
use domain::Point;
use serde_json::{Map, Value};
use sqlx::PgPool;

const INSERT_POINT: &str = "insert into device_points (measurement, device, tags, fields, ts) \
     values ($1, $2, $3::jsonb, $4::jsonb, to_timestamp($5 / 1000.0))";

pub struct PgMeasurementStore {
    pub pool: PgPool,
}

impl PgMeasurementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    /// 建表（幂等），启动时调用一次。
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "create table if not exists device_points (\
             id bigserial primary key, \
             measurement text not null, \
             device text not null, \
             tags jsonb not null, \
             fields jsonb not null, \
             ts timestamptz not null)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "create index if not exists device_points_device_ts \
             on device_points (device, ts desc)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

struct PointRow {
    device: String,
    tags: String,
    fields: String,
}

fn encode_point(point: &Point) -> Result<PointRow, StorageError> {
    let device = point
        .device()
        .ok_or_else(|| StorageError::new("point without device tag"))?
        .to_string();
    let tags = serde_json::to_string(&point.tags)?;
    let fields: Map<String, Value> = point
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), field_to_json(value)))
        .collect();
    let fields = serde_json::to_string(&fields)?;
    Ok(PointRow {
        device,
        tags,
        fields,
    })
}

#[async_trait::async_trait]
impl MeasurementStore for PgMeasurementStore {
    async fn write_point(&self, point: &Point) -> Result<(), StorageError> {
        let row = encode_point(point)?;
        sqlx::query(INSERT_POINT)
            .bind(&point.measurement)
            .bind(row.device)
            .bind(row.tags)
            .bind(row.fields)
            .bind(point.ts_ms as f64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
