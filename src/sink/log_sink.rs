//! Sink that writes everything to the tracing log.

use super::{Event, MetricsSink, ServiceStatus};
use crate::metrics::MetricValue;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        tracing::info!(metric = name, value, tags = ?tags, "gauge");
    }

    fn monotonic_count(&self, name: &str, value: MetricValue, tags: &[String]) {
        tracing::info!(metric = name, %value, tags = ?tags, "monotonic_count");
    }

    fn service_check(
        &self,
        name: &str,
        status: ServiceStatus,
        tags: &[String],
        message: Option<&str>,
    ) {
        match status {
            ServiceStatus::Ok => {
                tracing::info!(check = name, %status, tags = ?tags, "service_check")
            }
            ServiceStatus::Critical => tracing::warn!(
                check = name,
                %status,
                tags = ?tags,
                message = message.unwrap_or(""),
                "service_check"
            ),
        }
    }

    fn event(&self, event: Event) {
        tracing::warn!(
            event_type = %event.event_type,
            aggregation_key = %event.aggregation_key,
            timestamp = event.timestamp,
            tags = ?event.tags,
            "{}: {}",
            event.msg_title,
            event.msg_text
        );
    }
}
