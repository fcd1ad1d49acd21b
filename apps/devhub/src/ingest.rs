//! 采集链路装配
//!
//! 存储选择 → StoragePointSink → Dispatcher → DispatchPool → MqttSource。
//! 订阅列表来自设备目录中已知设备的 topic，外加发现用的通配订阅。

use devhub_config::AppConfig;
use devhub_ingest::{MqttSource, MqttSourceConfig, Source};
use devhub_pipeline::{DispatchPool, Dispatcher, LoggingObserver, StoragePointSink};
use devhub_registry::{DeviceDirectory, DeviceRegistry};
use devhub_storage::{
    InMemoryMeasurementStore, InMemoryRealtimeStore, MeasurementStore, PgMeasurementStore,
    RealtimeStore, RedisRealtimeStore, StorageError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 采集链路使用的存储。
#[derive(Clone)]
pub struct Stores {
    pub measurement: Arc<dyn MeasurementStore>,
    pub realtime: Arc<dyn RealtimeStore>,
}

impl Stores {
    /// 内存历史为定长环形缓冲，容量见 `history_capacity`。
    pub fn in_memory(history_capacity: usize) -> Self {
        Self {
            measurement: Arc::new(InMemoryMeasurementStore::with_capacity(history_capacity)),
            realtime: Arc::new(InMemoryRealtimeStore::new()),
        }
    }
}

/// 按配置选择存储：配置了数据库/Redis 的用对应实现，其余回落到内存。
pub async fn build_stores(config: &AppConfig) -> Result<Stores, StorageError> {
    let mut stores = Stores::in_memory(config.memory_history_capacity);
    if let Some(database_url) = &config.database_url {
        let store = PgMeasurementStore::connect(database_url).await?;
        store.ensure_schema().await?;
        stores.measurement = Arc::new(store);
        info!(target: "devhub.ingest", "measurement_store_postgres");
    }
    if let Some(redis_url) = &config.redis_url {
        let store =
            RedisRealtimeStore::connect_with_ttl(redis_url, config.redis_last_value_ttl_seconds)?;
        stores.realtime = Arc::new(store);
        info!(target: "devhub.ingest", "realtime_store_redis");
    }
    if config.database_url.is_none() {
        info!(
            target: "devhub.ingest",
            capacity = config.memory_history_capacity,
            "measurement_store_in_memory_ring"
        );
    }
    if config.redis_url.is_none() {
        info!(target: "devhub.ingest", "realtime_store_in_memory");
    }
    Ok(stores)
}

/// 启动采集任务；订阅列表在调用时从目录快照生成。
pub fn spawn_ingest(
    config: &AppConfig,
    directory: Arc<DeviceDirectory>,
    registry: Arc<dyn DeviceRegistry>,
    stores: &Stores,
) -> JoinHandle<()> {
    let sink = Arc::new(StoragePointSink::new(
        stores.measurement.clone(),
        stores.realtime.clone(),
        Duration::from_millis(config.sink_timeout_ms),
    ));
    let topics = directory.topics_for_all();
    let dispatcher = Arc::new(Dispatcher::new(
        directory,
        registry,
        sink,
        config.default_client_id,
    ));
    let source = MqttSource::new(MqttSourceConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        client_id: config.mqtt_client_id.clone(),
        topics,
        discovery_topic: Some(config.mqtt_discovery_topic.clone()),
    });
    let concurrency = config.dispatch_concurrency;
    tokio::spawn(async move {
        let pool = DispatchPool::start(dispatcher, concurrency, Arc::new(LoggingObserver));
        info!(
            target: "devhub.ingest",
            filters = source.config().subscription_filters().len(),
            concurrency,
            "ingest_started"
        );
        if let Err(err) = source.run(Arc::new(pool)).await {
            error!(target: "devhub.ingest", error = %err, "ingest_stopped");
        }
    })
}
