//! Sink that writes one JSON object per line.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use super::{Event, MetricsSink, ServiceStatus};
use crate::metrics::MetricValue;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Gauge {
        name: &'a str,
        value: f64,
        tags: &'a [String],
    },
    MonotonicCount {
        name: &'a str,
        value: MetricValue,
        tags: &'a [String],
    },
    ServiceCheck {
        name: &'a str,
        status: ServiceStatus,
        tags: &'a [String],
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<&'a str>,
    },
    Event(&'a Event),
}

/// Writes every sink call as a JSON line for an external shipper.
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, record: &Record<'_>) {
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = serde_json::to_writer(&mut *out, record)
            .map_err(std::io::Error::from)
            .and_then(|()| {
                out.write_all(b"\n")?;
                out.flush()
            });
        if let Err(e) = result {
            tracing::error!("Failed to write metrics record: {}", e);
        }
    }
}

impl<W: Write + Send> MetricsSink for JsonSink<W> {
    fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.write(&Record::Gauge { name, value, tags });
    }

    fn monotonic_count(&self, name: &str, value: MetricValue, tags: &[String]) {
        self.write(&Record::MonotonicCount { name, value, tags });
    }

    fn service_check(
        &self,
        name: &str,
        status: ServiceStatus,
        tags: &[String],
        message: Option<&str>,
    ) {
        self.write(&Record::ServiceCheck {
            name,
            status,
            tags,
            message,
        });
    }

    fn event(&self, event: Event) {
        self.write(&Record::Event(&event));
    }
}
