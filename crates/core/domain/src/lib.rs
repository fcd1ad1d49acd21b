//! 领域模型：设备、报文与规范化时序点。

pub mod data;
pub mod device;
pub mod topic;

pub use data::{FieldValue, InboundMessage, MEASUREMENT, Point};
pub use device::{Device, DeviceFamily};
pub use topic::device_id_from_topic;
