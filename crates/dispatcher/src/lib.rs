//! # Dispatcher
//!
//! 发送任务分发模块。
//!
//! 负责：
//! - 按 receiver 名称匹配已注册的发送策略
//! - 在独立任务中运行匹配的策略并等待其结束
//! - 将任务结果汇总为一个可选错误

pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod strategy;

pub use collector::ErrorCollector;
pub use contracts::{EmissionReport, EmissionRequest, UnknownReceiverPolicy};
pub use dispatcher::{start_sending_metrics, Dispatcher};
pub use error::DispatcherError;
pub use registry::{StrategyRegistry, LOG_RECEIVER, STATSD_RECEIVER};
pub use strategy::{EmissionStrategy, PacedStrategy};
