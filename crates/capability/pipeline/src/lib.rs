//! 分发流水线：InboundMessage → 设备识别 → 自动注册 → 分类解码 → PointSink。
//!
//! - [`Dispatcher`]：单条报文的完整处理，返回类型化的 [`DispatchReport`]
//! - [`DispatchPool`]：有界并发地为每条报文起一个任务，报告交给 [`ReportObserver`]
//! - [`PointSink`]：点写入边界，[`StoragePointSink`] 写历史 + 最新值

mod dispatcher;
mod pool;
mod sink;

pub use dispatcher::{
    DispatchOutcome, DispatchReport, Dispatcher, PAYLOAD_PREVIEW_LIMIT, RegistrationStatus,
    payload_preview,
};
pub use pool::{DispatchPool, LoggingObserver, ReportObserver};
pub use sink::{PointSink, SinkError, StoragePointSink};
