//! 数据接入：MQTT 订阅 → InboundMessage → MessageHandler。

use async_trait::async_trait;
use domain::InboundMessage;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, SubscribeFilter, SubscribeReasonCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// 报文处理器。
///
/// 实现方应尽快返回，耗时工作交给自己的任务池，否则会阻塞订阅循环。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn MessageHandler>) -> Result<(), IngestError>;
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    /// 已知设备的 topic。
    pub topics: Vec<String>,
    /// 发现新设备用的通配订阅（如 `#`）。
    pub discovery_topic: Option<String>,
}

impl MqttSourceConfig {
    /// 实际订阅的过滤器：设备 topic + 发现通配，去重且跳过空串。
    pub fn subscription_filters(&self) -> Vec<String> {
        let mut filters: Vec<String> = Vec::new();
        let candidates = self.topics.iter().chain(self.discovery_topic.iter());
        for topic in candidates {
            let topic = topic.trim();
            if !topic.is_empty() && !filters.iter().any(|known| known == topic) {
                filters.push(topic.to_string());
            }
        }
        filters
    }
}

/// MQTT 采集源。
///
/// 每次 ConnAck（含断线重连）都会重新订阅全部过滤器；
/// 事件循环出错时等待一秒后继续轮询，由 rumqttc 负责重连。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }

    fn options(&self) -> MqttOptions {
        let client_id = self
            .config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("devhub-ingest-{}", now_epoch_ms()));
        let mut options = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }
        options
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn MessageHandler>) -> Result<(), IngestError> {
        let filters = self.config.subscription_filters();
        if filters.is_empty() {
            return Err(IngestError::Source("no topics to subscribe".to_string()));
        }
        let (client, mut eventloop) = AsyncClient::new(self.options(), 64);
        info!(
            target: "devhub.ingest",
            host = %self.config.host,
            port = self.config.port,
            filters = filters.len(),
            "mqtt_source_started"
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(target: "devhub.ingest", "mqtt_connected");
                    // 请求通道由事件循环消费，订阅须在独立任务中发出
                    let client = client.clone();
                    let filters = filters.clone();
                    tokio::spawn(async move {
                        if let Err(err) = subscribe_all(&client, &filters).await {
                            warn!(target: "devhub.ingest", error = %err, "mqtt_subscribe_failed");
                        }
                    });
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    let failed = rejected_filters(&filters, &ack.return_codes);
                    for topic in &failed {
                        warn!(target: "devhub.ingest", topic = %topic, "mqtt_subscription_rejected");
                    }
                    debug!(
                        target: "devhub.ingest",
                        granted = ack.return_codes.len() - failed.len(),
                        "mqtt_suback"
                    );
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message =
                        InboundMessage::new(publish.topic, publish.payload.to_vec(), now_epoch_ms());
                    if let Err(err) = handler.handle(message).await {
                        warn!(target: "devhub.ingest", error = %err, "message_handler_failed");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "devhub.ingest", error = %err, "mqtt_connection_error");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

async fn subscribe_all(client: &AsyncClient, filters: &[String]) -> Result<(), IngestError> {
    let filters = filters
        .iter()
        .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce));
    client
        .subscribe_many(filters)
        .await
        .map_err(|err| IngestError::Source(err.to_string()))
}

/// SubAck 返回码与订阅请求中的过滤器一一对应。
fn rejected_filters<'a>(filters: &'a [String], codes: &[SubscribeReasonCode]) -> Vec<&'a str> {
    filters
        .iter()
        .zip(codes)
        .filter(|(_, code)| matches!(code, SubscribeReasonCode::Failure))
        .map(|(topic, _)| topic.as_str())
        .collect()
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(topics: &[&str], discovery: Option<&str>) -> MqttSourceConfig {
        MqttSourceConfig {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: Some("test".to_string()),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            discovery_topic: discovery.map(str::to_string),
        }
    }

    #[test]
    fn filters_are_deduplicated_and_include_discovery() {
        let config = config(&["tele/a/STATE", "", "tele/a/STATE", "tele/a/SENSOR"], Some("#"));
        assert_eq!(
            config.subscription_filters(),
            vec!["tele/a/STATE", "tele/a/SENSOR", "#"]
        );
    }

    #[test]
    fn discovery_only() {
        assert_eq!(config(&[], Some("#")).subscription_filters(), vec!["#"]);
        assert!(config(&[], None).subscription_filters().is_empty());
    }

    #[test]
    fn rejected_filters_follow_return_code_order() {
        let filters = vec!["a/1".to_string(), "b/#".to_string(), "c".to_string()];
        let codes = [
            SubscribeReasonCode::Success(QoS::AtMostOnce),
            SubscribeReasonCode::Failure,
            SubscribeReasonCode::Success(QoS::AtLeastOnce),
        ];
        assert_eq!(rejected_filters(&filters, &codes), vec!["b/#"]);
    }

    #[tokio::test]
    async fn run_without_filters_fails_fast() {
        struct Discard;

        #[async_trait]
        impl MessageHandler for Discard {
            async fn handle(&self, _message: InboundMessage) -> Result<(), IngestError> {
                Ok(())
            }
        }

        let source = MqttSource::new(config(&[], None));
        let err = source.run(Arc::new(Discard)).await.expect_err("no filters");
        assert!(matches!(err, IngestError::Source(_)));
    }
}
