//! In-memory sink for tests.

use std::sync::Mutex;

use super::{Event, MetricsSink, ServiceStatus};
use crate::metrics::MetricValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Gauge(String, f64, Vec<String>),
    MonotonicCount(String, MetricValue, Vec<String>),
    ServiceCheck(String, ServiceStatus, Vec<String>, Option<String>),
    Event(Event),
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Call>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn service_checks(&self) -> Vec<ServiceStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ServiceCheck(_, status, _, _) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Event(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn metric_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Gauge(..) | Call::MonotonicCount(..)))
            .count()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MetricsSink for RecordingSink {
    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.push(Call::Gauge(name.to_string(), value, tags.to_vec()));
    }

    fn monotonic_count(&self, name: &str, value: MetricValue, tags: &[String]) {
        self.push(Call::MonotonicCount(name.to_string(), value, tags.to_vec()));
    }

    fn service_check(
        &self,
        name: &str,
        status: ServiceStatus,
        tags: &[String],
        message: Option<&str>,
    ) {
        self.push(Call::ServiceCheck(
            name.to_string(),
            status,
            tags.to_vec(),
            message.map(str::to_string),
        ));
    }

    fn event(&self, event: Event) {
        self.push(Call::Event(event));
    }
}
