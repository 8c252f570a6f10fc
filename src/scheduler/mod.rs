//! Scheduler module for polling FreeRADIUS instances.

use crate::check::RadiusCheck;
use crate::config::{Instance, InstanceConfig};
use crate::probe::StatusTransport;
use crate::sink::MetricsSink;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Upper bound on the random delay before an instance's first check.
const MAX_START_JITTER: Duration = Duration::from_secs(1);

/// Validate instance configs, logging and dropping the invalid ones.
pub fn valid_instances(configs: &[InstanceConfig]) -> Vec<Instance> {
    configs
        .iter()
        .enumerate()
        .filter_map(|(i, cfg)| match cfg.validate() {
            Ok(instance) => Some(instance),
            Err(e) => {
                tracing::error!("Skipping instance #{}: {}", i + 1, e);
                None
            }
        })
        .collect()
}

/// Runs the check for every instance on a fixed interval.
pub struct Scheduler<T> {
    check: Arc<RadiusCheck<T>>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
    stop_tx: broadcast::Sender<()>,
}

impl<T> Scheduler<T>
where
    T: StatusTransport + Send + Sync + 'static,
{
    pub fn new(check: RadiusCheck<T>, sink: Arc<dyn MetricsSink>, interval: Duration) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            check: Arc::new(check),
            sink,
            interval,
            stop_tx,
        }
    }

    /// Start one polling task per instance.
    pub fn start(&self, instances: Vec<Instance>) -> Vec<JoinHandle<()>> {
        tracing::info!(
            "Starting scheduler with {} instances every {:?}",
            instances.len(),
            self.interval
        );

        instances
            .into_iter()
            .map(|instance| {
                tracing::info!("Scheduler: Adding instance {}", instance.target.address());
                tokio::spawn(run_check_loop(
                    self.check.clone(),
                    self.sink.clone(),
                    instance,
                    self.interval,
                    self.stop_tx.subscribe(),
                ))
            })
            .collect()
    }

    /// Check every instance once, one after another.
    pub async fn run_once(&self, instances: &[Instance]) {
        for instance in instances {
            if let Err(e) = self.check.run(instance, self.sink.as_ref()).await {
                tracing::debug!("Check failed for {}: {}", instance.target.address(), e);
            }
        }
    }

    /// Signal every polling task to stop after its current check.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

/// Run the check loop for a single instance.
///
/// Checks run inline, so an instance never overlaps with itself.
async fn run_check_loop<T: StatusTransport>(
    check: Arc<RadiusCheck<T>>,
    sink: Arc<dyn MetricsSink>,
    instance: Instance,
    interval_duration: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    // Spread instances out so they do not all fire at once
    let max_jitter = interval_duration.min(MAX_START_JITTER).as_millis().max(1) as u64;
    let jitter = Duration::from_millis(rand::random::<u64>() % max_jitter);

    tokio::select! {
        _ = stop_rx.recv() => return,
        _ = tokio::time::sleep(jitter) => {}
    }

    let mut interval = tokio::time::interval(interval_duration);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = check.run(&instance, sink.as_ref()).await {
                    tracing::debug!("Check failed for {}: {}", instance.target.address(), e);
                }
            }
        }
    }

    tracing::info!("Scheduler: Stopped instance {}", instance.target.address());
}
