//! Metric values produced by a check.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::Serialize;

/// The one metric reported as a gauge; everything else is a counter.
pub const RESPONSE_TIME_METRIC: &str = "freeradius.response_time";

/// A single metric value.
///
/// Serializes as a bare number; counters stay integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Monotonic counter read from the server.
    Count(u64),
    /// Measured duration in seconds.
    Seconds(f64),
}

impl MetricValue {
    /// Lossy above 2^53 for counters.
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Count(n) => n as f64,
            MetricValue::Seconds(s) => s,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Seconds(s) => write!(f, "{}", s),
        }
    }
}

/// Normalized metric name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet(BTreeMap<String, MetricValue>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: MetricValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MetricValue> {
        self.0.iter()
    }

    /// Remove the response-time entry, returning it in seconds.
    pub fn take_response_time(&mut self) -> Option<f64> {
        self.0.remove(RESPONSE_TIME_METRIC).map(|v| v.as_f64())
    }

    /// Move all entries of `other` into `self`; `other` wins on collisions.
    pub fn merge(&mut self, other: MetricSet) {
        self.0.extend(other.0);
    }
}

impl<'a> IntoIterator for &'a MetricSet {
    type Item = (&'a String, &'a MetricValue);
    type IntoIter = btree_map::Iter<'a, String, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
