pub mod cli;
pub mod config;
pub mod exporter;
pub mod logging;

pub use cli::Cli;
pub use config::{Config, ConfigError, LogLevel, QueueConfig, RetryConfig};
pub use exporter::{Exporter, ExporterStats};
pub use logging::{LoggingError, LoggingSystem, setup_logging};

use crate::domain::{ExportError, Signal};
use crate::sender::{BuildInfo, otlp};
use anyhow::{Context, bail};
use clap::Parser;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

async fn export_file(
    exporter: &Exporter,
    signal: Signal,
    path: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let request = otlp::decode(signal, &bytes)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let items = request.item_count();

    exporter
        .consume_with_cancel(request, cancel)
        .await
        .with_context(|| format!("failed to export {}", path.display()))?;

    info!(file = %path.display(), signal = %signal, items, "Exported");
    Ok(())
}

pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("invalid configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.signals = vec![cli.signal];
    config.queue.wait_for_result = true;

    setup_logging(config.log_level, cli.json_logs)?;
    info!("Starting rask-otlp-exporter v{}", crate::VERSION);

    let exporter = Exporter::new(config, BuildInfo::default()).context("invalid configuration")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling pending exports");
                cancel.cancel();
            }
        });
    }

    let results = join_all(
        cli.inputs
            .iter()
            .map(|path| export_file(&exporter, cli.signal, path, &cancel)),
    )
    .await;

    exporter.shutdown().await?;

    let failed: Vec<(&PathBuf, anyhow::Error)> = cli
        .inputs
        .iter()
        .zip(results)
        .filter_map(|(path, result)| result.err().map(|e| (path, e)))
        .collect();

    for (path, err) in &failed {
        let permanent = err
            .downcast_ref::<ExportError>()
            .is_some_and(ExportError::is_permanent);
        error!(file = %path.display(), permanent, "{err:#}");
    }

    let stats = exporter.stats();
    info!(
        requests = stats.transport.total_requests,
        retries = stats.retries,
        dropped = stats.queue.dropped,
        "Export finished"
    );

    if !failed.is_empty() {
        bail!("{} of {} exports failed", failed.len(), cli.inputs.len());
    }
    Ok(())
}
