// Observability: metrics and monitoring

pub mod metrics;

// Re-export main functions for ease of use
pub use metrics::{emit_counter, emit_gauge, init, MetricName};
