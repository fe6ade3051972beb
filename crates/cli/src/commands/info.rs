//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LoadgenConfig, UnknownReceiverPolicy};
use dispatcher::StrategyRegistry;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    statsd: StatsdInfo,
    emitter: EmitterInfo,
    unknown_receiver: UnknownReceiverPolicy,
    receivers: Vec<String>,
}

#[derive(Serialize)]
struct StatsdInfo {
    address: String,
    prefix: String,
    buffered: bool,
    flush_interval_ms: u64,
    max_packet_size: usize,
}

#[derive(Serialize)]
struct EmitterInfo {
    tick_interval_ms: u64,
    max_in_flight: usize,
    drain_timeout_ms: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    match args.config {
        Some(ref path) => info!(config = %path.display(), "Loading configuration info"),
        None => info!("Using built-in configuration"),
    }

    let config = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &LoadgenConfig) -> ConfigInfo {
    let registry = StrategyRegistry::with_defaults(config);

    ConfigInfo {
        statsd: StatsdInfo {
            address: config.statsd.address.clone(),
            prefix: config.statsd.prefix.clone(),
            buffered: config.statsd.buffered,
            flush_interval_ms: config.statsd.flush_interval_ms,
            max_packet_size: config.statsd.max_packet_size,
        },
        emitter: EmitterInfo {
            tick_interval_ms: config.emitter.tick_interval_ms,
            max_in_flight: config.emitter.max_in_flight,
            drain_timeout_ms: config.emitter.drain_timeout_ms,
        },
        unknown_receiver: config.dispatcher.unknown_receiver,
        receivers: registry
            .receivers()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Metrics Loadgen Configuration ===\n");

    println!("Statsd");
    println!("   ├─ Address: {}", info.statsd.address);
    println!("   ├─ Prefix: {}", info.statsd.prefix);
    if info.statsd.buffered {
        println!(
            "   └─ Buffered: flush every {}ms, max packet {} bytes",
            info.statsd.flush_interval_ms, info.statsd.max_packet_size
        );
    } else {
        println!("   └─ Buffered: no");
    }

    println!("\nEmitter");
    println!("   ├─ Tick interval: {}ms", info.emitter.tick_interval_ms);
    println!("   ├─ Max in flight: {}", info.emitter.max_in_flight);
    println!("   └─ Drain timeout: {}ms", info.emitter.drain_timeout_ms);

    println!("\nReceivers ({})", info.receivers.len());
    for (i, receiver) in info.receivers.iter().enumerate() {
        let prefix = if i == info.receivers.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {}", prefix, receiver);
    }
    println!("   (unknown receivers: {:?})", info.unknown_receiver);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lists_default_receivers() {
        let info = build_config_info(&LoadgenConfig::default());
        assert_eq!(info.receivers, vec!["log".to_string(), "statsd".to_string()]);
        assert_eq!(info.statsd.prefix, "statsd");
        assert_eq!(info.emitter.tick_interval_ms, 60_000);
    }

    #[test]
    fn test_info_json_serializes() {
        let info = build_config_info(&LoadgenConfig::default());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["unknown_receiver"], "ignore");
    }
}
