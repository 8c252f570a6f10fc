//! FreeRADIUS check: query, aggregate and report.

mod report;

pub use report::*;

use crate::config::{ConfigError, Instance, InstanceConfig};
use crate::metrics::{MetricSet, MetricValue, RESPONSE_TIME_METRIC};
use crate::probe::{run_query, QueryError, StatisticsCategory, StatusTransport, Target};
use crate::sink::MetricsSink;

/// Runs status checks through a transport and reports to a sink.
pub struct RadiusCheck<T> {
    transport: T,
}

impl<T: StatusTransport> RadiusCheck<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Validate an instance and run one check against it.
    ///
    /// Configuration errors are returned before any query is made; query
    /// failures are reported to the sink and do not surface here.
    pub async fn check(
        &self,
        instance: &InstanceConfig,
        sink: &dyn MetricsSink,
    ) -> Result<(), ConfigError> {
        let instance = instance.validate()?;
        // Failure was already reported as a CRITICAL check and an event
        if let Err(e) = self.run(&instance, sink).await {
            tracing::debug!("Check failed for {}: {}", instance.target.address(), e);
        }
        Ok(())
    }

    /// Run one check against a validated instance.
    ///
    /// On success the reported metrics are returned. On failure nothing but
    /// the CRITICAL service check and event is reported for this cycle.
    pub async fn run(
        &self,
        instance: &Instance,
        sink: &dyn MetricsSink,
    ) -> Result<MetricSet, QueryError> {
        let reporter = Reporter::new(sink, instance);

        let result = match instance.category {
            Some(category) => self.query(&instance.target, category, &reporter).await,
            None => self.query_all(&instance.target, &reporter).await,
        };

        match result {
            Ok(metrics) => {
                reporter.report_metrics(&metrics);
                tracing::debug!(
                    address = %instance.target.address(),
                    metrics = metrics.len(),
                    "check completed"
                );
                Ok(metrics)
            }
            Err(e) => {
                reporter.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Query a single category, reporting OK on success.
    pub async fn query(
        &self,
        target: &Target,
        category: StatisticsCategory,
        reporter: &Reporter<'_>,
    ) -> Result<MetricSet, QueryError> {
        let metrics = run_query(&self.transport, target, category).await?;
        reporter.report_ok();
        Ok(metrics)
    }

    /// Query every category once and merge the results.
    ///
    /// The combined response time is the mean of the per-category times. The
    /// first failure aborts the remaining categories.
    pub async fn query_all(
        &self,
        target: &Target,
        reporter: &Reporter<'_>,
    ) -> Result<MetricSet, QueryError> {
        let mut metrics = MetricSet::new();
        let mut response_times = Vec::with_capacity(StatisticsCategory::ALL.len());

        for category in StatisticsCategory::ALL {
            let mut result = self.query(target, category, reporter).await?;
            if let Some(seconds) = result.take_response_time() {
                response_times.push(seconds);
            }
            metrics.merge(result);
        }

        if !response_times.is_empty() {
            let mean = response_times.iter().sum::<f64>() / response_times.len() as f64;
            metrics.insert(RESPONSE_TIME_METRIC, MetricValue::Seconds(mean));
        }

        Ok(metrics)
    }
}
