//! 有界并发分发池。
//!
//! 每条报文一个 tokio 任务，并发上限由信号量控制；满载时 `handle`
//! 等待空位，从而把背压传回订阅循环。每个任务的报告经 mpsc 交给观察者。

use crate::dispatcher::{DispatchOutcome, DispatchReport, Dispatcher, RegistrationStatus};
use async_trait::async_trait;
use devhub_ingest::{IngestError, MessageHandler};
use devhub_telemetry::{
    record_dropped_decode, record_dropped_unknown_topic, record_message_received,
    record_point_written, record_registration_attempted, record_registration_existing,
    record_registration_failed, record_registration_succeeded, record_sink_failure,
};
use domain::InboundMessage;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

const REPORT_BUFFER: usize = 1024;

/// 分发报告的消费方。
pub trait ReportObserver: Send + Sync {
    fn observe(&self, report: DispatchReport);
}

/// 默认观察者：结构化日志 + 进程级计数器。
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ReportObserver for LoggingObserver {
    fn observe(&self, report: DispatchReport) {
        record_message_received();
        let device = report.device_id.as_deref().unwrap_or("");
        match &report.registration {
            Some(RegistrationStatus::Registered) => {
                record_registration_attempted();
                record_registration_succeeded();
                info!(target: "devhub.registry", device = %device, topic = %report.topic, "device_registered");
            }
            Some(RegistrationStatus::AlreadyRegistered) => {
                record_registration_attempted();
                record_registration_existing();
                info!(target: "devhub.registry", device = %device, "device_already_registered");
            }
            Some(RegistrationStatus::Failed(_)) => {
                record_registration_attempted();
                record_registration_failed();
            }
            None | Some(RegistrationStatus::Known) => {}
        }
        match &report.outcome {
            DispatchOutcome::Written { kind, fields } => {
                record_point_written();
                debug!(
                    target: "devhub.ingest",
                    topic = %report.topic,
                    device = %device,
                    kind = kind.as_str(),
                    fields = *fields,
                    "point_written"
                );
            }
            DispatchOutcome::DroppedUnknownTopic => {
                record_dropped_unknown_topic();
                debug!(target: "devhub.ingest", topic = %report.topic, "unknown_topic_dropped");
            }
            DispatchOutcome::DroppedDecode {
                kind,
                error,
                payload,
            } => {
                record_dropped_decode();
                warn!(
                    target: "devhub.ingest",
                    topic = %report.topic,
                    device = %device,
                    kind = kind.as_str(),
                    payload_len = report.payload_len,
                    payload = %payload,
                    error = %error,
                    "decode_failed"
                );
            }
            DispatchOutcome::DroppedSink(error) => {
                record_sink_failure();
                warn!(
                    target: "devhub.ingest",
                    topic = %report.topic,
                    device = %device,
                    error = %error,
                    "sink_write_failed"
                );
            }
        }
    }
}

/// 分发池，实现 [`MessageHandler`] 供采集源直接调用。
#[derive(Clone)]
pub struct DispatchPool {
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    reports: mpsc::Sender<DispatchReport>,
}

impl DispatchPool {
    /// 创建分发池并启动观察者任务。并发上限至少为 1。
    pub fn start(
        dispatcher: Arc<Dispatcher>,
        concurrency: usize,
        observer: Arc<dyn ReportObserver>,
    ) -> Self {
        let (reports, mut receiver) = mpsc::channel::<DispatchReport>(REPORT_BUFFER);
        tokio::spawn(async move {
            while let Some(report) = receiver.recv().await {
                observer.observe(report);
            }
        });
        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            reports,
        }
    }

    /// 当前空闲的并发槽位。
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl MessageHandler for DispatchPool {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| IngestError::Handler(err.to_string()))?;
        let dispatcher = self.dispatcher.clone();
        let reports = self.reports.clone();
        tokio::spawn(async move {
            let report = dispatcher.dispatch(message).await;
            drop(permit);
            if reports.send(report).await.is_err() {
                warn!(target: "devhub.ingest", "report_observer_closed");
            }
        });
        Ok(())
    }
}
