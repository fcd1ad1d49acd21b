//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub registry_url: String,
    pub registry_username: String,
    pub registry_password: String,
    pub registry_timeout_ms: u64,
    pub default_client_id: i64,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id: Option<String>,
    pub mqtt_discovery_topic: String,
    pub ingest_enabled: bool,
    pub dispatch_concurrency: usize,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub redis_last_value_ttl_seconds: Option<u64>,
    pub sink_timeout_ms: u64,
    /// 未配置数据库时内存历史保留的点数。
    pub memory_history_capacity: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let registry_username = read_required("DEVHUB_REGISTRY_USERNAME")?;
        let registry_password = read_required("DEVHUB_REGISTRY_PASSWORD")?;
        let jwt_secret = read_required("DEVHUB_JWT_SECRET")?;
        let http_addr =
            env::var("DEVHUB_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let registry_url = env::var("DEVHUB_REGISTRY_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());
        let registry_timeout_ms = read_u64_with_default("DEVHUB_REGISTRY_TIMEOUT_MS", 5000)?;
        let default_client_id = read_i64_with_default("DEVHUB_DEFAULT_CLIENT_ID", 1)?;
        let jwt_issuer = read_optional("DEVHUB_JWT_ISSUER");
        let mqtt_host = env::var("DEVHUB_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("DEVHUB_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("DEVHUB_MQTT_USERNAME");
        let mqtt_password = read_optional("DEVHUB_MQTT_PASSWORD");
        let mqtt_client_id = read_optional("DEVHUB_MQTT_CLIENT_ID");
        let mqtt_discovery_topic =
            env::var("DEVHUB_MQTT_DISCOVERY_TOPIC").unwrap_or_else(|_| "#".to_string());
        let ingest_enabled = read_bool_with_default("DEVHUB_INGEST", true);
        let dispatch_concurrency =
            read_u64_with_default("DEVHUB_DISPATCH_CONCURRENCY", 64)?.max(1) as usize;
        let database_url = read_optional("DEVHUB_DATABASE_URL");
        let redis_url = read_optional("DEVHUB_REDIS_URL");
        let redis_last_value_ttl_seconds =
            read_optional_u64("DEVHUB_REDIS_LAST_VALUE_TTL_SECONDS")?.filter(|value| *value > 0);
        let sink_timeout_ms = read_u64_with_default("DEVHUB_SINK_TIMEOUT_MS", 5000)?;
        let memory_history_capacity =
            read_u64_with_default("DEVHUB_MEMORY_HISTORY_CAPACITY", 10_000)?.max(1) as usize;

        Ok(Self {
            http_addr,
            registry_url,
            registry_username,
            registry_password,
            registry_timeout_ms,
            default_client_id,
            jwt_secret,
            jwt_issuer,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_client_id,
            mqtt_discovery_topic,
            ingest_enabled,
            dispatch_concurrency,
            database_url,
            redis_url,
            redis_last_value_ttl_seconds,
            sink_timeout_ms,
            memory_history_capacity,
        })
    }
}

fn read_required(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_i64_with_default(key: &str, default: i64) -> Result<i64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<i64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
