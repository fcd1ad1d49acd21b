//! 路由定义
//!
//! - 健康检查：/health
//! - 最新字段值：/metrics/{device}/{field}

use crate::AppState;
use crate::handlers::*;
use axum::{Router, routing::get};

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics/:device/:field", get(get_metric_value))
}
