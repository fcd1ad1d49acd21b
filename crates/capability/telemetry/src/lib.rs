//! 追踪初始化、请求 ID 生成与采集计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub points_written: u64,
    pub dropped_unknown_topic: u64,
    pub dropped_decode: u64,
    pub sink_failures: u64,
    pub registrations_attempted: u64,
    pub registrations_succeeded: u64,
    pub registrations_existing: u64,
    pub registrations_failed: u64,
    pub directory_refreshes: u64,
    pub directory_refresh_failures: u64,
    pub token_renewals: u64,
    pub reauthentications: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    messages_received: AtomicU64,
    points_written: AtomicU64,
    dropped_unknown_topic: AtomicU64,
    dropped_decode: AtomicU64,
    sink_failures: AtomicU64,
    registrations_attempted: AtomicU64,
    registrations_succeeded: AtomicU64,
    registrations_existing: AtomicU64,
    registrations_failed: AtomicU64,
    directory_refreshes: AtomicU64,
    directory_refresh_failures: AtomicU64,
    token_renewals: AtomicU64,
    reauthentications: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            points_written: AtomicU64::new(0),
            dropped_unknown_topic: AtomicU64::new(0),
            dropped_decode: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            registrations_attempted: AtomicU64::new(0),
            registrations_succeeded: AtomicU64::new(0),
            registrations_existing: AtomicU64::new(0),
            registrations_failed: AtomicU64::new(0),
            directory_refreshes: AtomicU64::new(0),
            directory_refresh_failures: AtomicU64::new(0),
            token_renewals: AtomicU64::new(0),
            reauthentications: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            dropped_unknown_topic: self.dropped_unknown_topic.load(Ordering::Relaxed),
            dropped_decode: self.dropped_decode.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            registrations_attempted: self.registrations_attempted.load(Ordering::Relaxed),
            registrations_succeeded: self.registrations_succeeded.load(Ordering::Relaxed),
            registrations_existing: self.registrations_existing.load(Ordering::Relaxed),
            registrations_failed: self.registrations_failed.load(Ordering::Relaxed),
            directory_refreshes: self.directory_refreshes.load(Ordering::Relaxed),
            directory_refresh_failures: self.directory_refresh_failures.load(Ordering::Relaxed),
            token_renewals: self.token_renewals.load(Ordering::Relaxed),
            reauthentications: self.reauthentications.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，RUST_LOG 可覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录收到的 MQTT 报文数。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功写入的点数。
pub fn record_point_written() {
    metrics().points_written.fetch_add(1, Ordering::Relaxed);
}

/// 记录因 topic 段数不足而丢弃的报文。
pub fn record_dropped_unknown_topic() {
    metrics()
        .dropped_unknown_topic
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败丢弃的报文。
pub fn record_dropped_decode() {
    metrics().dropped_decode.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入失败（含超时）。
pub fn record_sink_failure() {
    metrics().sink_failures.fetch_add(1, Ordering::Relaxed);
}

pub fn record_registration_attempted() {
    metrics()
        .registrations_attempted
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_registration_succeeded() {
    metrics()
        .registrations_succeeded
        .fetch_add(1, Ordering::Relaxed);
}

/// 注册中心报告设备已存在（按成功处理）。
pub fn record_registration_existing() {
    metrics()
        .registrations_existing
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_registration_failed() {
    metrics()
        .registrations_failed
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_directory_refresh() {
    metrics().directory_refreshes.fetch_add(1, Ordering::Relaxed);
}

pub fn record_directory_refresh_failure() {
    metrics()
        .directory_refresh_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录 refresh token 换发成功次数。
pub fn record_token_renewal() {
    metrics().token_renewals.fetch_add(1, Ordering::Relaxed);
}

/// 记录回退到完整登录的次数。
pub fn record_reauthentication() {
    metrics().reauthentications.fetch_add(1, Ordering::Relaxed);
}
