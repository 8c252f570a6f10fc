//! radwatch daemon entry point.

use radwatch::check::RadiusCheck;
use radwatch::config::{InstancesFile, OutputFormat, ServerConfig};
use radwatch::probe::RadclientTransport;
use radwatch::scheduler::{self, Scheduler};
use radwatch::sink::{JsonSink, LogSink, MetricsSink};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("radwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Loading instances from {}", cfg.config_path);
    let file = InstancesFile::load(&cfg.config_path)?;

    let instances = scheduler::valid_instances(&file.instances);
    if instances.is_empty() {
        return Err(format!("no valid instances in {}", cfg.config_path).into());
    }

    let sink: Arc<dyn MetricsSink> = match cfg.output {
        OutputFormat::Log => Arc::new(LogSink),
        OutputFormat::Json => Arc::new(JsonSink::new(std::io::stdout())),
    };

    let check = RadiusCheck::new(RadclientTransport::new(file.radclient.clone()));
    let scheduler = Scheduler::new(check, sink, file.interval());

    if cfg.run_once {
        scheduler.run_once(&instances).await;
        return Ok(());
    }

    let handles = scheduler.start(instances);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    scheduler.stop();
    for handle in handles {
        handle.await?;
    }

    Ok(())
}
