//! Probe module for FreeRADIUS status queries.
//!
//! A probe is one Status-Server round trip for a single statistics category:
//! the transport performs the exchange, the classifier sorts out the failure
//! shapes, and the parser turns the counters into metrics.

mod classify;
mod parse;
mod radclient;

pub use classify::*;
pub use parse::*;
pub use radclient::*;

use crate::metrics::{MetricSet, MetricValue, RESPONSE_TIME_METRIC};

use md5::{Digest, Md5};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Query failure types.
///
/// Each variant maps to exactly one reporting path in the check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("no response from server")]
    Timeout,
    #[error("status request rejected")]
    AccessRejected,
    #[error("radclient returned status code {code}")]
    AbnormalExit { code: i32, output: String },
}

/// Counter groups exposed by the FreeRADIUS status server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsCategory {
    Authentication,
    Accounting,
    ProxyAuthentication,
    ProxyAccounting,
}

impl StatisticsCategory {
    /// Every category, each queried exactly once by a full check.
    pub const ALL: [StatisticsCategory; 4] = [
        StatisticsCategory::Authentication,
        StatisticsCategory::Accounting,
        StatisticsCategory::ProxyAuthentication,
        StatisticsCategory::ProxyAccounting,
    ];

    /// Value of the `FreeRADIUS-Statistics-Type` attribute.
    pub fn code(self) -> u32 {
        match self {
            StatisticsCategory::Authentication => 1,
            StatisticsCategory::Accounting => 2,
            StatisticsCategory::ProxyAuthentication => 4,
            StatisticsCategory::ProxyAccounting => 8,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            StatisticsCategory::Authentication => "authentication",
            StatisticsCategory::Accounting => "accounting",
            StatisticsCategory::ProxyAuthentication => "proxy_authentication",
            StatisticsCategory::ProxyAccounting => "proxy_accounting",
        }
    }
}

impl fmt::Display for StatisticsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatisticsCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown statistics type: {}", s))
    }
}

/// One monitored FreeRADIUS server.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub timeout: Duration,
}

impl Target {
    /// `host:port` as handed to radclient.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Stable identifier used to group repeated alerts for this server.
    pub fn aggregation_key(&self) -> String {
        let input = format!("{}/{}", self.host, self.port);
        format!("{:x}", Md5::digest(input.as_bytes()))
    }
}

/// The attribute list sent with a Status-Server request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusRequest {
    pub category: StatisticsCategory,
}

impl StatusRequest {
    pub fn new(category: StatisticsCategory) -> Self {
        Self { category }
    }

    /// Render the request in radclient's attribute syntax.
    pub fn attributes(&self) -> String {
        format!(
            "Message-Authenticator = 0x00, FreeRADIUS-Statistics-Type = {}, Response-Packet-Type = Access-Accept",
            self.category.code()
        )
    }
}

/// Output of one status exchange, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQueryResult {
    pub output: String,
    pub elapsed: Duration,
    pub exit_code: i32,
}

/// Performs one bounded status round trip.
///
/// Implementations must not retry; a hard deadline expiring is `Timeout`.
pub trait StatusTransport {
    fn round_trip(
        &self,
        target: &Target,
        request: &StatusRequest,
    ) -> impl Future<Output = Result<RawQueryResult, QueryError>> + Send;
}

/// Run a status query for one category.
///
/// Returns the parsed counters plus the measured response time in seconds.
pub async fn run_query<T: StatusTransport>(
    transport: &T,
    target: &Target,
    category: StatisticsCategory,
) -> Result<MetricSet, QueryError> {
    let request = StatusRequest::new(category);
    let raw = transport.round_trip(target, &request).await?;

    tracing::debug!(
        address = %target.address(),
        category = %category,
        exit_code = raw.exit_code,
        elapsed_ms = raw.elapsed.as_millis() as u64,
        "status round trip finished"
    );

    classify(&raw.output, raw.exit_code)?;

    let mut metrics = parse_counters(&raw.output);
    metrics.insert(
        RESPONSE_TIME_METRIC,
        MetricValue::Seconds(raw.elapsed.as_secs_f64()),
    );
    Ok(metrics)
}
