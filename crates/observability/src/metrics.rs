//! 发送指标收集模块
//!
//! 基于 `metrics` facade 的薄封装。未安装 recorder 时所有调用均为空操作，
//! 库代码可以无条件记录。

use contracts::EmissionReport;
use metrics::{counter, gauge, histogram};

/// 记录一次发送运行开始
pub fn record_run_started(receiver: &str, rate_per_minute: u64) {
    counter!("loadgen_runs_started_total", "receiver" => receiver.to_string()).increment(1);
    gauge!("loadgen_rate_per_minute", "receiver" => receiver.to_string())
        .set(rate_per_minute as f64);
}

/// 记录一次 tick 及其批量大小
pub fn record_tick(receiver: &str, batch_size: u64) {
    counter!("loadgen_ticks_total", "receiver" => receiver.to_string()).increment(1);
    counter!("loadgen_increments_scheduled_total", "receiver" => receiver.to_string())
        .increment(batch_size);
}

/// 记录单次 increment 的结果
pub fn record_increment(receiver: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "loadgen_increments_total",
        "receiver" => receiver.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("loadgen_increment_latency_ms", "receiver" => receiver.to_string())
        .record(latency_ms);
}

/// 记录 drain 超时后被放弃的 increment
pub fn record_aborted(receiver: &str, count: u64) {
    if count > 0 {
        counter!("loadgen_increments_aborted_total", "receiver" => receiver.to_string())
            .increment(count);
    }
}

/// 记录运行结束
pub fn record_run_finished(report: &EmissionReport) {
    counter!(
        "loadgen_runs_finished_total",
        "receiver" => report.receiver.clone()
    )
    .increment(1);
    histogram!("loadgen_run_duration_seconds", "receiver" => report.receiver.clone())
        .record(report.elapsed.as_secs_f64());
    gauge!("loadgen_last_run_throughput", "receiver" => report.receiver.clone())
        .set(report.throughput());
}

/// 记录发送前失败的运行 (sink 获取失败、panic)
pub fn record_run_failed(receiver: &str, reason: &'static str) {
    counter!(
        "loadgen_runs_failed_total",
        "receiver" => receiver.to_string(),
        "reason" => reason
    )
    .increment(1);
}
