//! DevHub 进程入口：配置 → 日志 → 注册中心登录 → 设备目录 → 采集 → HTTP。

use devhub::ingest::{build_stores, spawn_ingest};
use devhub::{AppState, build_app};
use devhub_auth::JwtManager;
use devhub_config::AppConfig;
use devhub_registry::{DeviceDirectory, RegistryClient, RegistryConfig};
use devhub_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    // 启动时登录失败直接退出
    let registry = Arc::new(
        RegistryClient::connect(RegistryConfig {
            base_url: config.registry_url.clone(),
            username: config.registry_username.clone(),
            password: config.registry_password.clone(),
            timeout: Duration::from_millis(config.registry_timeout_ms),
        })
        .await?,
    );
    let directory = Arc::new(DeviceDirectory::new(registry.clone()));
    if let Err(err) = directory.refresh().await {
        warn!(target: "devhub.registry", error = %err, "initial_directory_empty");
    }

    let stores = build_stores(&config).await?;
    if config.ingest_enabled {
        spawn_ingest(&config, directory, registry.clone(), &stores);
    } else {
        info!(target: "devhub.ingest", "ingest_disabled");
    }

    let state = AppState {
        verifier: Arc::new(JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
        )),
        registry,
        realtime_store: stores.realtime.clone(),
        store_timeout: Duration::from_millis(config.sink_timeout_ms),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}
