//! DevHub 服务：MQTT 采集链路 + 只读 HTTP API。

pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod routes;
pub mod utils;

use axum::{Router, http::Method, http::header, middleware::from_fn};
use devhub_auth::TokenVerifier;
use devhub_registry::DeviceRegistry;
use devhub_storage::RealtimeStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// 读接口共享状态。
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub realtime_store: Arc<dyn RealtimeStore>,
    /// 最新值查询的超时上限。
    pub store_timeout: Duration,
}

/// 组装完整路由：同一组接口同时挂在 `/` 与 `/api` 下。
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    Router::new()
        .merge(routes::create_api_router())
        .nest("/api", routes::create_api_router())
        .with_state(state)
        .layer(cors)
        .layer(from_fn(middleware::request_context))
}
