//! Counter extraction from radclient output.

use std::sync::OnceLock;

use regex::Regex;

use crate::metrics::{MetricSet, MetricValue};

/// Extract every `FreeRADIUS-Total-* = <n>` counter and normalize its name.
///
/// Never fails: output without counters yields an empty set, and values that
/// do not fit in a u64 are skipped.
pub fn parse_counters(output: &str) -> MetricSet {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?P<name>FreeRADIUS-Total-\S+) = (?P<val>\d+)").expect("valid counter pattern")
    });

    let mut metrics = MetricSet::new();
    for caps in re.captures_iter(output) {
        let (Some(name), Some(val)) = (caps.name("name"), caps.name("val")) else {
            continue;
        };
        match val.as_str().parse::<u64>() {
            Ok(count) => metrics.insert(format_metric(name.as_str()), MetricValue::Count(count)),
            Err(e) => tracing::debug!("Skipping counter {}: {}", name.as_str(), e),
        }
    }
    metrics
}

/// Turn a FreeRADIUS attribute name into a dotted metric name.
///
/// `FreeRADIUS-Total-Access-Accepts` becomes `freeradius.access.accepts`.
pub fn format_metric(stat: &str) -> String {
    stat.to_lowercase().replace('-', ".").replace(".total.", ".")
}
