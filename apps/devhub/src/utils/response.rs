//! HTTP 错误响应辅助函数
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use devhub_auth::TokenError;
use devhub_registry::RegistryError;
use devhub_storage::StorageError;
use std::time::Duration;
use tracing::warn;

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// 认证错误响应
pub fn auth_error(status: StatusCode) -> Response {
    error_response(status, "AUTH.UNAUTHORIZED", "unauthorized")
}

/// 禁止访问错误响应
pub fn forbidden_error() -> Response {
    error_response(StatusCode::FORBIDDEN, "AUTH.FORBIDDEN", "forbidden")
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    error_response(StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND", "no value recorded")
}

/// 认证内部错误响应
pub fn internal_auth_error(err: TokenError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR", err.to_string())
}

/// 注册中心错误响应
pub fn registry_error(err: RegistryError) -> Response {
    warn!(target: "devhub.registry", error = %err, "authorization_lookup_failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "REGISTRY.ERROR", err.to_string())
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR", err.to_string())
}

/// 存储查询超时响应
pub fn storage_timeout_error(timeout: Duration) -> Response {
    warn!(
        target: "devhub.storage",
        timeout_ms = timeout.as_millis() as u64,
        "latest_value_lookup_timed_out"
    );
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORAGE.TIMEOUT",
        format!("storage lookup timed out after {:?}", timeout),
    )
}
