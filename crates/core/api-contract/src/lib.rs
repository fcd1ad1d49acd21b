//! 稳定的 DTO 与 API 响应契约。
//!
//! - 注册中心（token / devices）的请求与响应体
//! - 读接口 `/metrics/{device}/{field}` 的响应体与错误体

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装（错误与健康检查使用）。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 注册中心登录请求体（POST /token/）。
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// 注册中心刷新请求体（POST /token/refresh/）。
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// 注册中心签发的 token。
///
/// 刷新接口在不轮换 refresh token 时只返回 access。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// 注册中心返回的设备。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDeviceDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub serial_number: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<i64>,
}

/// 设备注册请求体（POST /devices/）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub serial_number: String,
    pub description: String,
    pub device_type: String,
    pub client: i64,
}

/// 读接口返回的最新字段值。
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricValueDto {
    pub device: String,
    pub field: String,
    pub value: serde_json::Value,
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub ok: bool,
    pub metrics: MetricsSnapshotDto,
}

/// 采集计数器快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub messages_received: u64,
    pub points_written: u64,
    pub dropped_unknown_topic: u64,
    pub dropped_decode: u64,
    pub sink_failures: u64,
    pub registrations_attempted: u64,
    pub registrations_succeeded: u64,
    pub registrations_existing: u64,
    pub registrations_failed: u64,
    pub directory_refreshes: u64,
    pub directory_refresh_failures: u64,
    pub token_renewals: u64,
    pub reauthentications: u64,
}
