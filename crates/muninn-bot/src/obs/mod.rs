//! Observability (metrics).
//!
//! Tracing is initialized in `main`. This module only hosts the in-process
//! Prometheus counter registry.

pub mod metrics;

pub use metrics::{BotMetrics, CounterVec};
