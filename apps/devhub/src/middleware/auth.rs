//! 请求上下文与 bearer 认证
//!
//! - request_context：注入 request_id/trace_id（响应头 + 日志 span）
//! - bearer_token：从 Authorization 头提取 token
//! - require_principal：校验 token，得到调用方用户名

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use devhub_auth::{Principal, TokenError};
use devhub_telemetry::new_request_ids;
use tracing::{Instrument, info_span};

use crate::AppState;
use crate::utils::response::{auth_error, internal_auth_error};

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    for (name, value) in [("x-request-id", &ids.request_id), ("x-trace-id", &ids.trace_id)] {
        response.headers_mut().insert(
            name,
            HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
    }
    response
}

/// 从请求头中提取 Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header_value = headers.get(header::AUTHORIZATION)?;
    let auth_str = header_value.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").filter(|token| !token.is_empty())
}

/// 校验 token 并返回调用方；缺失、无效、过期均为 401。
pub fn require_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err(auth_error(StatusCode::UNAUTHORIZED));
    };
    match state.verifier.verify(token) {
        Ok(principal) => Ok(principal),
        Err(TokenError::TokenInvalid | TokenError::TokenExpired | TokenError::MissingUsername) => {
            Err(auth_error(StatusCode::UNAUTHORIZED))
        }
        Err(err @ TokenError::Internal(_)) => Err(internal_auth_error(err)),
    }
}
