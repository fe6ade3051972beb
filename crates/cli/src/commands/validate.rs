//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LoadgenConfig, UnknownReceiverPolicy};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    address: String,
    prefix: String,
    buffered: bool,
    tick_interval_ms: u64,
    max_in_flight: usize,
    unknown_receiver: UnknownReceiverPolicy,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    address: config.statsd.address.clone(),
                    prefix: config.statsd.prefix.clone(),
                    buffered: config.statsd.buffered,
                    tick_interval_ms: config.emitter.tick_interval_ms,
                    max_in_flight: config.emitter.max_in_flight,
                    unknown_receiver: config.dispatcher.unknown_receiver,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &LoadgenConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.statsd.prefix.is_empty() {
        warnings.push("statsd.prefix is empty - metric names are sent unprefixed".to_string());
    }

    if config.statsd.buffered && config.statsd.max_packet_size > 65_507 {
        warnings.push(format!(
            "statsd.max_packet_size {} exceeds the UDP payload limit",
            config.statsd.max_packet_size
        ));
    }

    if config.emitter.drain_timeout_ms == 0 {
        warnings.push(
            "emitter.drain_timeout_ms is 0 - in-flight increments are aborted at the deadline"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Statsd: {} (prefix '{}')", summary.address, summary.prefix);
            println!("  Buffered: {}", summary.buffered);
            println!("  Tick interval: {}ms", summary.tick_interval_ms);
            println!("  Max in flight: {}", summary.max_in_flight);
            println!("  Unknown receivers: {:?}", summary.unknown_receiver);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
