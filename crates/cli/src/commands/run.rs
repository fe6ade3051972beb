//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use contracts::{EmissionRequest, LoadgenConfig, UnknownReceiverPolicy};
use dispatcher::Dispatcher;

use crate::cli::RunArgs;
use crate::summary::RunSummary;

/// Execute the `run` command
pub async fn run_emit(args: &RunArgs) -> Result<()> {
    if let Some(ref path) = args.config {
        info!(config = %path.display(), "Loading configuration");
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
    }

    let mut config = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        receiver = %args.receiver,
        address = %config.statsd.address,
        prefix = %config.statsd.prefix,
        tick_ms = config.emitter.tick_interval_ms,
        rate = args.rate,
        duration_secs = args.duration,
        "Configuration loaded"
    );

    let dispatcher = Dispatcher::from_config(&config);
    let request = EmissionRequest::new(
        args.receiver.as_str(),
        Duration::from_secs(args.duration),
        args.rate,
    );

    let (stop, shutdown) = watch::channel(false);
    let dispatch = dispatcher.dispatch_until(request, shutdown);
    tokio::pin!(dispatch);

    info!("Starting emission...");

    // On a signal the run stops ticking but still drains, flushes and reports.
    let result = tokio::select! {
        result = &mut dispatch => result,
        _ = setup_shutdown_signal() => {
            warn!("Received shutdown signal, stopping emission...");
            let _ = stop.send(true);
            dispatch.await
        }
    };

    match result.context("Emission failed")? {
        Some(report) => {
            info!(
                ticks = report.ticks,
                sent = report.increments_sent,
                failed = report.increments_failed,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Emission completed"
            );
            RunSummary::from(report).print();
        }
        None => {
            warn!(
                receiver = %args.receiver,
                known = ?dispatcher.registry().receivers(),
                "Receiver not registered, nothing emitted"
            );
        }
    }

    info!("Metrics loadgen finished");
    Ok(())
}

/// Fold CLI overrides into the loaded configuration
fn apply_overrides(config: &mut LoadgenConfig, args: &RunArgs) {
    if let Some(ref address) = args.address {
        info!(address = %address, "Overriding statsd address from CLI");
        config.statsd.address = address.clone();
    }
    if let Some(ref prefix) = args.prefix {
        info!(prefix = %prefix, "Overriding statsd prefix from CLI");
        config.statsd.prefix = prefix.clone();
    }
    if let Some(tick_ms) = args.tick_ms {
        info!(tick_ms = tick_ms, "Overriding tick interval from CLI");
        config.emitter.tick_interval_ms = tick_ms;
    }
    if args.strict {
        config.dispatcher.unknown_receiver = UnknownReceiverPolicy::Reject;
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
