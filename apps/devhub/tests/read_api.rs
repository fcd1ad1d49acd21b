use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use devhub::{AppState, build_app};
use devhub_auth::JwtManager;
use devhub_registry::{
    DeviceRegistration, DeviceRegistry, RegisterOutcome, RegistryError,
};
use devhub_storage::{FieldSample, InMemoryRealtimeStore, RealtimeStore, StorageError};
use domain::{Device, FieldValue, Point};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct OwnershipRegistry;

#[async_trait]
impl DeviceRegistry for OwnershipRegistry {
    async fn list_all_devices(&self) -> Result<Vec<Device>, RegistryError> {
        Ok(Vec::new())
    }

    async fn list_devices_for_user(&self, user: &str) -> Result<Vec<Device>, RegistryError> {
        match user {
            "alice" => Ok(vec![
                Device::new("em-1", Vec::new()),
                Device::new("plug-1", Vec::new()),
            ]),
            "broken" => Err(RegistryError::Timeout),
            _ => Ok(Vec::new()),
        }
    }

    async fn register_device(
        &self,
        _registration: &DeviceRegistration,
    ) -> Result<RegisterOutcome, RegistryError> {
        Ok(RegisterOutcome::Created)
    }
}

fn state(realtime_store: Arc<dyn RealtimeStore>, store_timeout: Duration) -> AppState {
    AppState {
        verifier: Arc::new(JwtManager::new(SECRET.to_string(), None)),
        registry: Arc::new(OwnershipRegistry),
        realtime_store,
        store_timeout,
    }
}

/// 查询永不返回的最新值存储。
struct StalledStore;

#[async_trait]
impl RealtimeStore for StalledStore {
    async fn upsert_last_fields(&self, _point: &Point) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_last_field(
        &self,
        _device: &str,
        _field: &str,
    ) -> Result<Option<FieldSample>, StorageError> {
        std::future::pending().await
    }
}

async fn app() -> axum::Router {
    let realtime = Arc::new(InMemoryRealtimeStore::new());
    realtime
        .upsert_last_fields(
            &Point::new("em-1", "shelly", "power_meter", 1000)
                .with_field("Power", FieldValue::F64(123.45)),
        )
        .await
        .expect("seed");
    realtime
        .upsert_last_fields(
            &Point::new("plug-1", "nousat", "state", 1000)
                .with_field("POWER", FieldValue::String("ON".to_string())),
        )
        .await
        .expect("seed");
    build_app(state(realtime, Duration::from_secs(5)))
}

fn token(username: &str) -> String {
    JwtManager::new(SECRET.to_string(), None)
        .issue_token(username, 3600)
        .expect("token")
}

async fn get(app: axum::Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(bearer) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    let response = app
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn returns_latest_value_for_owned_device() {
    let (status, body) = get(app().await, "/metrics/em-1/Power", Some(&token("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"], "em-1");
    assert_eq!(body["field"], "Power");
    assert_eq!(body["value"], 123.45);

    let (status, body) = get(app().await, "/api/metrics/plug-1/POWER", Some(&token("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "ON");
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let (status, body) = get(app().await, "/metrics/em-1/Power", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH.UNAUTHORIZED");

    let (status, _) = get(app().await, "/metrics/em-1/Power", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = JwtManager::new("other-secret".to_string(), None)
        .issue_token("alice", 3600)
        .expect("token");
    let (status, _) = get(app().await, "/metrics/em-1/Power", Some(&foreign)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn device_outside_user_scope_is_forbidden() {
    let (status, body) = get(app().await, "/metrics/em-1/Power", Some(&token("bob"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTH.FORBIDDEN");
}

#[tokio::test]
async fn unrecorded_field_is_not_found() {
    let (status, _) = get(app().await, "/metrics/em-1/Voltage", Some(&token("alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registry_failure_is_internal_error() {
    let (status, body) = get(app().await, "/metrics/em-1/Power", Some(&token("broken"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "REGISTRY.ERROR");
}

#[tokio::test]
async fn stalled_store_lookup_times_out() {
    let app = build_app(state(Arc::new(StalledStore), Duration::from_millis(50)));
    let (status, body) = get(app, "/metrics/em-1/Power", Some(&token("alice"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "STORAGE.TIMEOUT");
}

#[tokio::test]
async fn health_reports_counters_and_request_ids() {
    let response = app()
        .await
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-trace-id"));
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["ok"], true);
    assert!(body["metrics"]["messagesReceived"].is_u64());
}
