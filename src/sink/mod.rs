//! Metrics sinks.
//!
//! A sink receives everything a check emits: gauges, monotonic counters,
//! service checks and alert events.

mod json;
mod log_sink;
#[cfg(test)]
pub(crate) mod recording;

pub use json::*;
pub use log_sink::*;

use serde::Serialize;
use std::fmt;

use crate::metrics::MetricValue;

/// Health of a monitored service as seen by one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Ok,
    Critical,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Ok => f.write_str("OK"),
            ServiceStatus::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// An alert event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Unix seconds.
    pub timestamp: i64,
    pub event_type: String,
    pub msg_title: String,
    pub tags: Vec<String>,
    pub msg_text: String,
    pub aggregation_key: String,
}

/// Destination for check output.
pub trait MetricsSink: Send + Sync {
    fn gauge(&self, name: &str, value: f64, tags: &[String]);

    /// Counters arrive as `MetricValue` so values above 2^53 stay exact.
    fn monotonic_count(&self, name: &str, value: MetricValue, tags: &[String]);

    fn service_check(
        &self,
        name: &str,
        status: ServiceStatus,
        tags: &[String],
        message: Option<&str>,
    );

    fn event(&self, event: Event);
}
