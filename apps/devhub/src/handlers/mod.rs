//! HTTP handlers

pub mod health;
pub mod metrics;

pub use health::*;
pub use metrics::*;
