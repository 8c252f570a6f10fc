//! Routing of check results to a sink.

use chrono::Utc;

use crate::config::Instance;
use crate::metrics::{MetricSet, RESPONSE_TIME_METRIC};
use crate::probe::{QueryError, Target};
use crate::sink::{Event, MetricsSink, ServiceStatus};

/// Service check name and event type.
pub const CHECK_NAME: &str = "freeradius";

/// Reports one check invocation for one instance.
pub struct Reporter<'a> {
    sink: &'a dyn MetricsSink,
    target: &'a Target,
    tags: Vec<String>,
    aggregation_key: String,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a dyn MetricsSink, instance: &'a Instance) -> Self {
        let target = &instance.target;
        let mut tags = vec![
            format!("host:{}", target.host),
            format!("port:{}", target.port),
        ];
        tags.extend(instance.tags.iter().cloned());

        Self {
            sink,
            target,
            tags,
            aggregation_key: target.aggregation_key(),
        }
    }

    pub fn report_ok(&self) {
        self.sink
            .service_check(CHECK_NAME, ServiceStatus::Ok, &self.tags, None);
    }

    /// Response time goes out as a gauge, every other metric as a monotonic count.
    pub fn report_metrics(&self, metrics: &MetricSet) {
        for (name, value) in metrics {
            if name == RESPONSE_TIME_METRIC {
                self.sink.gauge(name, value.as_f64(), &self.tags);
            } else {
                self.sink.monotonic_count(name, *value, &self.tags);
            }
        }
    }

    /// Emit one CRITICAL service check and one event describing the failure.
    pub fn report_failure(&self, failure: &QueryError) {
        let title = failure_title(failure);
        let text = failure_message(failure, self.target);

        tracing::warn!("{}: {}", title, text);

        self.sink
            .service_check(CHECK_NAME, ServiceStatus::Critical, &self.tags, Some(title));
        self.sink.event(Event {
            timestamp: Utc::now().timestamp(),
            event_type: CHECK_NAME.to_string(),
            msg_title: title.to_string(),
            tags: self.tags.clone(),
            msg_text: text,
            aggregation_key: self.aggregation_key.clone(),
        });
    }
}

pub fn failure_title(failure: &QueryError) -> &'static str {
    match failure {
        QueryError::Timeout => "No response from FreeRADIUS",
        QueryError::AccessRejected => "FreeRADIUS status request rejected",
        QueryError::AbnormalExit { .. } => "radclient process returned error",
    }
}

pub fn failure_message(failure: &QueryError, target: &Target) -> String {
    match failure {
        QueryError::Timeout => format!(
            "{} failed to respond to status request. \
             FreeRADIUS may be down or the secret may be incorrect.",
            target.address()
        ),
        QueryError::AccessRejected => format!(
            "{} rejected status request. FreeRADIUS may not be \
             configured to serve status requests or the secret may be incorrect.",
            target.address()
        ),
        QueryError::AbnormalExit { code, output } => format!(
            "radclient returned status code {} with this output: {}",
            code, output
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValue;
    use crate::probe::testing::target;
    use crate::sink::recording::{Call, RecordingSink};

    fn instance() -> Instance {
        Instance {
            target: target(),
            category: None,
            tags: vec!["env:test".to_string()],
        }
    }

    fn tags() -> Vec<String> {
        vec![
            "host:127.0.0.1".to_string(),
            "port:18121".to_string(),
            "env:test".to_string(),
        ]
    }

    #[test]
    fn test_report_metrics_routes_by_name() {
        let sink = RecordingSink::default();
        let instance = instance();
        let reporter = Reporter::new(&sink, &instance);

        let mut metrics = MetricSet::new();
        metrics.insert("freeradius.access.requests", MetricValue::Count(42));
        metrics.insert(RESPONSE_TIME_METRIC, MetricValue::Seconds(0.25));
        reporter.report_metrics(&metrics);

        assert_eq!(
            sink.calls(),
            vec![
                Call::MonotonicCount(
                    "freeradius.access.requests".to_string(),
                    MetricValue::Count(42),
                    tags(),
                ),
                Call::Gauge(RESPONSE_TIME_METRIC.to_string(), 0.25, tags()),
            ]
        );
    }

    #[test]
    fn test_report_metrics_keeps_large_counters_exact() {
        let sink = RecordingSink::default();
        let instance = instance();
        let reporter = Reporter::new(&sink, &instance);

        let big = u64::MAX - 1;
        let mut metrics = MetricSet::new();
        metrics.insert("freeradius.access.requests", MetricValue::Count(big));
        reporter.report_metrics(&metrics);

        assert_eq!(
            sink.calls(),
            vec![Call::MonotonicCount(
                "freeradius.access.requests".to_string(),
                MetricValue::Count(big),
                tags(),
            )]
        );
    }

    #[test]
    fn test_report_failure_emits_critical_and_event() {
        let sink = RecordingSink::default();
        let instance = instance();
        let reporter = Reporter::new(&sink, &instance);

        reporter.report_failure(&QueryError::Timeout);

        let calls = sink.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            Call::ServiceCheck(
                CHECK_NAME.to_string(),
                ServiceStatus::Critical,
                tags(),
                Some("No response from FreeRADIUS".to_string()),
            )
        );

        let events = sink.events();
        let event = &events[0];
        assert_eq!(event.event_type, "freeradius");
        assert_eq!(event.msg_title, "No response from FreeRADIUS");
        assert_eq!(
            event.msg_text,
            "127.0.0.1:18121 failed to respond to status request. \
             FreeRADIUS may be down or the secret may be incorrect."
        );
        assert_eq!(event.tags, tags());
        assert_eq!(event.aggregation_key, instance.target.aggregation_key());
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_failure_texts() {
        let t = target();
        assert_eq!(
            failure_message(&QueryError::AccessRejected, &t),
            "127.0.0.1:18121 rejected status request. FreeRADIUS may not be configured \
             to serve status requests or the secret may be incorrect."
        );

        let exit = QueryError::AbnormalExit {
            code: 3,
            output: "radclient: Nothing to send".to_string(),
        };
        assert_eq!(failure_title(&exit), "radclient process returned error");
        assert_eq!(
            failure_message(&exit, &t),
            "radclient returned status code 3 with this output: radclient: Nothing to send"
        );
    }
}
