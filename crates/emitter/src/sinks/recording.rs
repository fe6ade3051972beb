//! RecordingSink - 线程安全的测试替身
//!
//! 记录每个被接受的 increment 并统计生命周期调用，
//! 测试可以不依赖完成顺序断言总数与取值。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{ContractError, CounterRecord, MetricSink, SinkFactory};

/// connector 与其打开的所有 sink 共享的状态
#[derive(Debug, Default)]
pub struct RecordingState {
    records: Mutex<Vec<CounterRecord>>,
    opened: AtomicU64,
    flushed: AtomicU64,
    closed: AtomicU64,
    attempts: AtomicU64,
    active: AtomicU64,
    max_active: AtomicU64,
}

impl RecordingState {
    /// 所有被接受的记录，按完成顺序
    pub fn records(&self) -> Vec<CounterRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 所有被接受记录的 delta，按完成顺序
    pub fn values(&self) -> Vec<i64> {
        self.records().into_iter().map(|r| r.delta).collect()
    }

    pub fn record_count(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// increment 调用次数，包括被拒绝的
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn flushed(&self) -> u64 {
        self.flushed.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }

    /// 同时执行的 increment 峰值
    pub fn max_concurrent(&self) -> u64 {
        self.max_active.load(Ordering::SeqCst)
    }

    fn push(&self, record: CounterRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Opens [`RecordingSink`]s that share one [`RecordingState`]
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    state: Arc<RecordingState>,
    open_error: Option<String>,
    fail_writes: bool,
    delay: Option<Duration>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `open` 总是以 `message` 失败的 connector
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// 每次 increment 都返回写入错误
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// 每次 increment 在完成前等待 `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn state(&self) -> Arc<RecordingState> {
        Arc::clone(&self.state)
    }
}

impl SinkFactory for RecordingConnector {
    type Sink = RecordingSink;

    async fn open(&self) -> Result<RecordingSink, ContractError> {
        if let Some(message) = &self.open_error {
            return Err(ContractError::sink_connection("recording", message.clone()));
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingSink {
            state: Arc::clone(&self.state),
            fail_writes: self.fail_writes,
            delay: self.delay,
            closed: AtomicBool::new(false),
        })
    }
}

/// 在内存中记录 increment 的 sink
#[derive(Debug)]
pub struct RecordingSink {
    state: Arc<RecordingState>,
    fail_writes: bool,
    delay: Option<Duration>,
    closed: AtomicBool,
}

impl MetricSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn increment(&self, record: &CounterRecord) -> Result<(), ContractError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(ContractError::sink_closed("recording"));
        }

        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.state.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_writes {
            return Err(ContractError::sink_write("recording", "mock failure"));
        }
        self.state.push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), ContractError> {
        self.state.flushed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), ContractError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_lifecycle() {
        let connector = RecordingConnector::new();
        let sink = connector.open().await.unwrap();

        sink.increment(&CounterRecord::for_index(3)).await.unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let state = connector.state();
        assert_eq!(state.values(), vec![3]);
        assert_eq!(state.opened(), 1);
        assert_eq!(state.closed(), 1);
        assert!(sink.increment(&CounterRecord::for_index(4)).await.is_err());
        assert_eq!(state.attempts(), 2);
    }

    #[tokio::test]
    async fn test_failing_open() {
        let connector = RecordingConnector::failing("unreachable");
        let err = connector.open().await.unwrap_err();
        assert!(err.is_setup_error());
        assert_eq!(connector.state().opened(), 0);
    }
}
