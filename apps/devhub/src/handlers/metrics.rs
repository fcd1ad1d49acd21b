//! 最新字段值查询。
//!
//! - GET /metrics/{device}/{field}
//!
//! 调用方需携带 bearer token；设备必须出现在注册中心为该用户返回的设备列表中。

use crate::AppState;
use crate::middleware::require_principal;
use crate::utils::response::{
    forbidden_error, not_found_error, registry_error, storage_error, storage_timeout_error,
};
use api_contract::MetricValueDto;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use devhub_storage::field_to_json;

pub async fn get_metric_value(
    State(state): State<AppState>,
    Path((device, field)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let principal = match require_principal(&state, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match state.registry.list_devices_for_user(&principal.username).await {
        Ok(devices) if devices.iter().any(|owned| owned.serial == device) => {}
        Ok(_) => return forbidden_error(),
        Err(err) => return registry_error(err),
    }
    let lookup = state.realtime_store.get_last_field(&device, &field);
    let result = match tokio::time::timeout(state.store_timeout, lookup).await {
        Ok(result) => result,
        Err(_) => return storage_timeout_error(state.store_timeout),
    };
    match result {
        Ok(Some(sample)) => (
            StatusCode::OK,
            Json(MetricValueDto {
                device,
                field,
                value: field_to_json(&sample.value),
            }),
        )
            .into_response(),
        Ok(None) => not_found_error(),
        Err(err) => storage_error(err),
    }
}
