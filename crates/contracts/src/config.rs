//! LoadgenConfig - Config Loader 输出
//!
//! 所有字段均有默认值，空文档即为合法配置。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// tick 与 flush 间隔上限 (一天，毫秒)
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// 负载生成器的完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadgenConfig {
    /// Statsd 传输设置
    pub statsd: StatsdConfig,

    /// 所有 receiver 共用的节拍设置
    pub emitter: EmitterConfig,

    /// Receiver 分发设置
    pub dispatcher: DispatcherSettings,
}

/// Statsd 传输配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsdConfig {
    /// 目标地址 (host:port, UDP)
    pub address: String,

    /// 指标名前缀，以 '.' 连接
    pub prefix: String,

    /// 将多行合并到一个数据报，而非每次 increment 一个数据报
    pub buffered: bool,

    /// 未满缓冲区的强制刷新间隔 (毫秒)
    pub flush_interval_ms: u64,

    /// buffered 模式下数据报最大负载 (字节)
    pub max_packet_size: usize,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8125".to_string(),
            prefix: "statsd".to_string(),
            buffered: true,
            flush_interval_ms: 300,
            max_packet_size: 1432,
        }
    }
}

impl StatsdConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// 节拍发送器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// 批次间隔 (毫秒)
    pub tick_interval_ms: u64,

    /// 同时访问 sink 的 increment 上限
    pub max_in_flight: usize,

    /// 截止时间后等待未完成 increment 的宽限期 (毫秒)
    pub drain_timeout_ms: u64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 60_000,
            max_in_flight: 1024,
            drain_timeout_ms: 5_000,
        }
    }
}

impl EmitterConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Receiver 分发配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// 未注册 receiver 的处理方式
    pub unknown_receiver: UnknownReceiverPolicy,
}

/// 未注册 receiver 的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReceiverPolicy {
    /// 直接成功，不发送任何数据
    #[default]
    Ignore,
    /// 返回 unknown-receiver 错误
    Reject,
}
