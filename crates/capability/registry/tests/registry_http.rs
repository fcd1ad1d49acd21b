//! 以真实 axum 路由模拟注册中心，经由 reqwest 客户端验证 token 生命周期。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use devhub_registry::{
    DeviceDirectory, DeviceRegistration, DeviceRegistry, RegisterOutcome, RegistryClient,
    RegistryConfig, RegistryError,
};
use domain::DeviceFamily;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeRegistry {
    access: String,
    refresh: String,
    issued: u32,
    login_calls: u32,
    refresh_calls: u32,
    device_gets: u32,
    reject_refresh: bool,
    always_unauthorized: bool,
    registered: Vec<String>,
}

type Shared = Arc<Mutex<FakeRegistry>>;

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Given token not valid for any token type" })),
    )
        .into_response()
}

fn authorized(state: &FakeRegistry, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", state.access);
    !state.always_unauthorized
        && headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().expect("lock");
    state.login_calls += 1;
    if body["username"] != "admin" || body["password"] != "superpass" {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }
    state.issued += 1;
    state.access = format!("access-{}", state.issued);
    state.refresh = format!("refresh-{}", state.issued);
    Json(json!({ "access": state.access, "refresh": state.refresh })).into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().expect("lock");
    state.refresh_calls += 1;
    if state.reject_refresh || body["refresh"] != state.refresh.as_str() {
        return unauthorized();
    }
    state.issued += 1;
    state.access = format!("access-{}", state.issued);
    // 不轮换 refresh token，只返回 access
    Json(json!({ "access": state.access })).into_response()
}

async fn list_devices(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().expect("lock");
    state.device_gets += 1;
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!([
        { "id": 1, "serial_number": "em-1", "description": "", "device_type": "shelly_em",
          "topics": ["shellies/em-1/emeter/0/power", "shellies/em-1/emeter/0/voltage"] },
        { "id": 2, "serial_number": "plug-1", "device_type": "nous_at",
          "topics": ["tele/plug-1/STATE", "tele/plug-1/SENSOR"] }
    ]))
    .into_response()
}

async fn user_devices(
    State(state): State<Shared>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    if user == "slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    let state = state.lock().expect("lock");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if user == "bob" {
        return Json(json!([{ "serial_number": "plug-1", "topics": [] }])).into_response();
    }
    Json(json!([])).into_response()
}

async fn register(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("lock");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let serial = body["serial_number"].as_str().unwrap_or_default().to_string();
    if serial == "boom" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response();
    }
    if state.registered.contains(&serial) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "serial_number": ["device with this serial number already exists."] })),
        )
            .into_response();
    }
    state.registered.push(serial);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn spawn_registry(state: Shared) -> String {
    let app = Router::new()
        .route("/api/token/", post(login))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/devices/", get(list_devices).post(register))
        .route("/api/devices/:user/", get(user_devices))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}/api", addr)
}

fn config(base_url: String, password: &str) -> RegistryConfig {
    RegistryConfig {
        base_url,
        username: "admin".to_string(),
        password: password.to_string(),
        timeout: Duration::from_millis(500),
    }
}

async fn connected() -> (Shared, RegistryClient) {
    let state: Shared = Arc::default();
    let base_url = spawn_registry(state.clone()).await;
    let client = RegistryClient::connect(config(base_url, "superpass"))
        .await
        .expect("connect");
    (state, client)
}

fn registration(serial: &str) -> DeviceRegistration {
    DeviceRegistration {
        serial: serial.to_string(),
        description: format!("Auto-registered from topic tele/{}/STATE", serial),
        family: DeviceFamily::NousAt,
        owner: 1,
    }
}

#[tokio::test]
async fn connect_fails_on_bad_credentials() {
    let state: Shared = Arc::default();
    let base_url = spawn_registry(state).await;
    let err = RegistryClient::connect(config(base_url, "wrong"))
        .await
        .err()
        .expect("login must fail");
    assert!(matches!(
        err,
        RegistryError::Auth(devhub_registry::AuthError::Rejected { status: 401, .. })
    ));
}

#[tokio::test]
async fn lists_all_devices_with_bearer_token() {
    let (state, client) = connected().await;
    let devices = client.list_all_devices().await.expect("devices");
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].serial, "em-1");
    assert_eq!(devices[0].family, Some(DeviceFamily::ShellyEm));
    assert_eq!(devices[1].topics, vec!["tele/plug-1/STATE", "tele/plug-1/SENSOR"]);
    assert_eq!(state.lock().expect("lock").device_gets, 1);
}

#[tokio::test]
async fn expired_access_token_is_renewed_and_replayed_once() {
    let (state, client) = connected().await;
    state.lock().expect("lock").access = "rotated-by-backend".to_string();

    let devices = client.list_all_devices().await.expect("devices");
    assert_eq!(devices.len(), 2);

    let state = state.lock().expect("lock");
    assert_eq!(state.refresh_calls, 1);
    assert_eq!(state.login_calls, 1);
    assert_eq!(state.device_gets, 2);
    drop(state);
    assert_eq!(client.session().current_access_token().await, "access-2");
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_login() {
    let (state, client) = connected().await;
    {
        let mut state = state.lock().expect("lock");
        state.access = "rotated-by-backend".to_string();
        state.reject_refresh = true;
    }

    let devices = client.list_all_devices().await.expect("devices");
    assert_eq!(devices.len(), 2);

    let state = state.lock().expect("lock");
    assert_eq!(state.refresh_calls, 1);
    assert_eq!(state.login_calls, 2);
}

#[tokio::test]
async fn renew_keeps_refresh_token_when_backend_does_not_rotate() {
    let (state, client) = connected().await;
    client.session().renew().await.expect("first renew");
    client.session().renew().await.expect("second renew");
    let state = state.lock().expect("lock");
    assert_eq!(state.refresh_calls, 2);
    assert_eq!(state.login_calls, 1);
}

#[tokio::test]
async fn second_unauthorized_is_terminal() {
    let (state, client) = connected().await;
    state.lock().expect("lock").always_unauthorized = true;

    let err = client.list_all_devices().await.expect_err("unauthorized");
    assert!(matches!(err, RegistryError::Status { status: 401, .. }));
    assert_eq!(state.lock().expect("lock").device_gets, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_calls_share_one_renewal() {
    let (state, client) = connected().await;
    state.lock().expect("lock").access = "rotated-by-backend".to_string();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.list_all_devices().await }));
    }
    for task in tasks {
        task.await.expect("join").expect("devices");
    }
    let state = state.lock().expect("lock");
    assert_eq!(state.refresh_calls, 1);
    assert_eq!(state.login_calls, 1);
}

#[tokio::test]
async fn lists_devices_for_user() {
    let (_state, client) = connected().await;
    let devices = client.list_devices_for_user("bob").await.expect("devices");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].serial, "plug-1");
    assert!(client.list_devices_for_user("carol").await.expect("devices").is_empty());
}

#[tokio::test]
async fn slow_registry_times_out() {
    let (_state, client) = connected().await;
    let err = client.list_devices_for_user("slow").await.expect_err("timeout");
    assert!(matches!(err, RegistryError::Timeout));
}

#[tokio::test]
async fn register_treats_existing_serial_as_success() {
    let (_state, client) = connected().await;
    let first = client
        .register_device(&registration("plug-9"))
        .await
        .expect("register");
    let second = client
        .register_device(&registration("plug-9"))
        .await
        .expect("register again");
    assert_eq!(first, RegisterOutcome::Created);
    assert_eq!(second, RegisterOutcome::AlreadyExists);

    let err = client
        .register_device(&registration("boom"))
        .await
        .expect_err("server error");
    assert!(matches!(err, RegistryError::Status { status: 500, ref body } if body == "database down"));
}

#[tokio::test]
async fn directory_builds_subscription_list_from_registry() {
    let (_state, client) = connected().await;
    let directory = DeviceDirectory::new(Arc::new(client));
    directory.refresh().await.expect("refresh");
    assert!(directory.contains("plug-1"));
    assert!(!directory.contains("unknown"));
    assert_eq!(directory.topics_for_all().len(), 4);
}

#[tokio::test]
async fn authenticate_replaces_token_pair() {
    let (state, client) = connected().await;
    assert_eq!(client.session().current_access_token().await, "access-1");

    client
        .session()
        .authenticate("admin", "superpass")
        .await
        .expect("authenticate");
    assert_eq!(client.session().current_access_token().await, "access-2");

    // 新 refresh token 生效：续期不再回退为登录
    client.session().renew().await.expect("renew");
    let state = state.lock().expect("lock");
    assert_eq!(state.login_calls, 2);
    assert_eq!(state.refresh_calls, 1);
    assert_eq!(state.refresh, "refresh-2");
}

#[tokio::test]
async fn authenticate_with_wrong_password_keeps_current_tokens() {
    let (state, client) = connected().await;
    let err = client
        .session()
        .authenticate("admin", "wrong")
        .await
        .expect_err("rejected");
    assert!(matches!(
        err,
        devhub_registry::AuthError::Rejected { status: 401, .. }
    ));
    assert_eq!(client.session().current_access_token().await, "access-1");
    assert_eq!(state.lock().expect("lock").login_calls, 2);
    assert_eq!(client.list_all_devices().await.expect("devices").len(), 2);
}
