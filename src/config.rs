//! Configuration module for radwatch.
//!
//! Process settings are loaded from environment variables with sensible
//! defaults; the monitored FreeRADIUS instances come from a TOML file.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::probe::{StatisticsCategory, Target};

const DEFAULT_TIMEOUT_SECS: f64 = 1.0;
const DEFAULT_INTERVAL_SECS: f64 = 15.0;

/// Longest accepted timeout or interval.
const MAX_SECONDS: Duration = Duration::from_secs(86_400);

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing '{0}' from instance configuration")]
    MissingField(&'static str),
    #[error("invalid '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse instances file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where check output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Structured tracing log lines.
    Log,
    /// One JSON object per line on stdout.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(OutputFormat::Log),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the instances file (default: "radwatch.toml")
    pub config_path: String,
    /// Sink for check output (default: log)
    pub output: OutputFormat,
    /// Check every instance once and exit instead of polling
    pub run_once: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: "radwatch.toml".to_string(),
            output: OutputFormat::Log,
            run_once: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RADWATCH_CONFIG`: Instances file path (default: "radwatch.toml")
    /// - `RADWATCH_OUTPUT`: `log` or `json` (default: "log")
    /// - `RADWATCH_RUN_ONCE`: `1` or `true` to run a single pass
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(path) = lookup("RADWATCH_CONFIG") {
            cfg.config_path = path;
        }

        if let Some(output) = lookup("RADWATCH_OUTPUT") {
            match output.parse() {
                Ok(format) => cfg.output = format,
                Err(e) => tracing::warn!("Ignoring RADWATCH_OUTPUT: {}", e),
            }
        }

        if let Some(once) = lookup("RADWATCH_RUN_ONCE") {
            cfg.run_once = matches!(once.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        cfg
    }
}

/// Contents of the instances file.
#[derive(Debug, Clone, Deserialize)]
pub struct InstancesFile {
    /// Seconds between checks of the same instance.
    #[serde(default = "default_interval", rename = "interval")]
    interval_secs: f64,
    /// `interval_secs` once validated by `load_from_str`.
    #[serde(skip)]
    interval: Duration,
    /// radclient binary to execute.
    #[serde(default = "default_radclient")]
    pub radclient: String,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECS
}

fn default_radclient() -> String {
    "radclient".to_string()
}

impl InstancesFile {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::load_from_str(&s)
    }

    /// Parse and validate the file-level settings from a string.
    ///
    /// Instances are validated one by one when the check runs.
    pub fn load_from_str(s: &str) -> Result<Self, ConfigError> {
        let mut file: InstancesFile = toml::from_str(s)?;
        file.interval = seconds("interval", file.interval_secs)?;
        if file.radclient.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "radclient",
                reason: "must be non-empty".to_string(),
            });
        }
        Ok(file)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Convert a seconds value from the file, rejecting anything outside
/// (0, MAX_SECONDS].
fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidField {
        field,
        reason: format!(
            "must be > 0 and at most {} seconds, got {}",
            MAX_SECONDS.as_secs(),
            value
        ),
    };
    let duration = Duration::try_from_secs_f64(value).map_err(|_| invalid())?;
    if duration.is_zero() || duration > MAX_SECONDS {
        return Err(invalid());
    }
    Ok(duration)
}

/// Statistics type as written in the file: a category name or its code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CategorySelector {
    Code(u32),
    Name(String),
}

impl CategorySelector {
    fn resolve(&self) -> Result<StatisticsCategory, ConfigError> {
        match self {
            CategorySelector::Code(code) => {
                StatisticsCategory::from_code(*code).ok_or_else(|| ConfigError::InvalidField {
                    field: "type",
                    reason: format!("unknown statistics type code: {}", code),
                })
            }
            CategorySelector::Name(name) => name
                .parse()
                .map_err(|reason| ConfigError::InvalidField {
                    field: "type",
                    reason,
                }),
        }
    }
}

/// One instance as written in the file; every field is checked by `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceConfig {
    pub host: Option<String>,
    pub port: Option<i64>,
    pub secret: Option<String>,
    /// Seconds (default: 1)
    pub timeout: Option<f64>,
    #[serde(rename = "type")]
    pub statistics_type: Option<CategorySelector>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated instance, ready to check.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub target: Target,
    /// `None` queries all four categories.
    pub category: Option<StatisticsCategory>,
    pub tags: Vec<String>,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<Instance, ConfigError> {
        let host = self.host.as_deref().ok_or(ConfigError::MissingField("host"))?;
        let port = self.port.ok_or(ConfigError::MissingField("port"))?;
        let secret = self
            .secret
            .as_deref()
            .ok_or(ConfigError::MissingField("secret"))?;

        if host.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "host",
                reason: "must be non-empty".to_string(),
            });
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ConfigError::InvalidField {
                field: "port",
                reason: format!("must be between 1 and 65535, got {}", port),
            })?;
        if secret.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "secret",
                reason: "must be non-empty".to_string(),
            });
        }

        let timeout = seconds("timeout", self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))?;

        let category = self
            .statistics_type
            .as_ref()
            .map(CategorySelector::resolve)
            .transpose()?;

        Ok(Instance {
            target: Target {
                host: host.to_string(),
                port,
                secret: secret.to_string(),
                timeout,
            },
            category,
            tags: self.tags.clone(),
        })
    }
}
