//! Human-readable run summary.

use std::time::Duration;

use contracts::{EmissionReport, StatsSummary};

/// Statistics from a finished run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub receiver: String,
    pub ticks: u64,
    pub scheduled: u64,
    pub sent: u64,
    pub failed: u64,
    pub aborted: u64,
    pub duration: Duration,
    pub latency_ms: StatsSummary,
}

impl From<EmissionReport> for RunSummary {
    fn from(report: EmissionReport) -> Self {
        Self {
            receiver: report.receiver,
            ticks: report.ticks,
            scheduled: report.increments_scheduled,
            sent: report.increments_sent,
            failed: report.increments_failed,
            aborted: report.increments_aborted,
            duration: report.elapsed,
            latency_ms: report.increment_latency_ms,
        }
    }
}

impl RunSummary {
    /// Increments sent per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sent as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed increments as percentage of scheduled
    pub fn failure_rate(&self) -> f64 {
        if self.scheduled > 0 {
            (self.failed as f64 / self.scheduled as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print(&self) {
        println!("\n=== Emission Summary ({}) ===\n", self.receiver);

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Scheduled: {}", self.scheduled);
        println!("   ├─ Sent: {}", self.sent);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            self.failed,
            self.failure_rate()
        );
        println!("   ├─ Aborted: {}", self.aborted);
        println!("   └─ Throughput: {:.2}/s", self.throughput());

        if self.latency_ms.count > 0 {
            println!("\nIncrement latency (ms)");
            println!("   └─ {}", self.latency_ms);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rates() {
        let summary = RunSummary {
            scheduled: 200,
            sent: 150,
            failed: 50,
            duration: Duration::from_secs(10),
            ..Default::default()
        };
        assert!((summary.throughput() - 15.0).abs() < f64::EPSILON);
        assert!((summary.failure_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::default();
        assert_eq!(summary.throughput(), 0.0);
        assert_eq!(summary.failure_rate(), 0.0);
    }
}
