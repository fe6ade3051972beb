//! 配置校验模块
//!
//! 校验规则：
//! - statsd.address 非空且形如 host:port
//! - statsd.max_packet_size > 0
//! - buffered 时 statsd.flush_interval_ms 位于 (0, MAX_INTERVAL_MS]
//! - emitter.tick_interval_ms 位于 (0, MAX_INTERVAL_MS]
//! - emitter.max_in_flight > 0

use contracts::{ContractError, EmitterConfig, LoadgenConfig, StatsdConfig, MAX_INTERVAL_MS};

/// 校验 LoadgenConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LoadgenConfig) -> Result<(), ContractError> {
    validate_statsd(&config.statsd)?;
    validate_emitter(&config.emitter)?;
    Ok(())
}

fn validate_statsd(statsd: &StatsdConfig) -> Result<(), ContractError> {
    let address = statsd.address.trim();
    if address.is_empty() {
        return Err(ContractError::config_validation(
            "statsd.address",
            "address cannot be empty",
        ));
    }

    let port = address.rsplit_once(':').map(|(_, port)| port);
    if !matches!(port, Some(p) if p.parse::<u16>().is_ok()) {
        return Err(ContractError::config_validation(
            "statsd.address",
            format!("expected host:port, got '{}'", statsd.address),
        ));
    }

    if statsd.max_packet_size == 0 {
        return Err(ContractError::config_validation(
            "statsd.max_packet_size",
            "max_packet_size must be > 0",
        ));
    }

    if statsd.buffered && statsd.flush_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "statsd.flush_interval_ms",
            "flush_interval_ms must be > 0 when buffered = true",
        ));
    }

    if statsd.flush_interval_ms > MAX_INTERVAL_MS {
        return Err(ContractError::config_validation(
            "statsd.flush_interval_ms",
            format!("flush_interval_ms must be <= {MAX_INTERVAL_MS}"),
        ));
    }

    Ok(())
}

fn validate_emitter(emitter: &EmitterConfig) -> Result<(), ContractError> {
    if emitter.tick_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "emitter.tick_interval_ms",
            "tick_interval_ms must be > 0",
        ));
    }

    if emitter.tick_interval_ms > MAX_INTERVAL_MS {
        return Err(ContractError::config_validation(
            "emitter.tick_interval_ms",
            format!("tick_interval_ms must be <= {MAX_INTERVAL_MS}"),
        ));
    }

    if emitter.max_in_flight == 0 {
        return Err(ContractError::config_validation(
            "emitter.max_in_flight",
            "max_in_flight must be > 0",
        ));
    }

    Ok(())
}
