//! StatsdSink - statsd counters over UDP
//!
//! Lines are rendered as `<prefix>.<name>:<delta>|c[|@<rate>]`. In buffered
//! mode lines are joined with '\n' into datagrams of at most
//! `max_packet_size` bytes; a background task forces out partially filled
//! buffers every `flush_interval`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ContractError, CounterRecord, MetricSink, SinkFactory, StatsdConfig, MAX_INTERVAL_MS,
};
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, instrument, trace, warn};

/// Opens [`StatsdSink`]s from a fixed configuration
#[derive(Debug, Clone)]
pub struct StatsdConnector {
    name: String,
    config: StatsdConfig,
}

impl StatsdConnector {
    pub fn new(config: StatsdConfig) -> Self {
        Self {
            name: "statsd".to_string(),
            config,
        }
    }

    pub fn config(&self) -> &StatsdConfig {
        &self.config
    }
}

impl SinkFactory for StatsdConnector {
    type Sink = StatsdSink;

    async fn open(&self) -> Result<StatsdSink, ContractError> {
        StatsdSink::connect(&self.name, self.config.clone()).await
    }
}

/// Sink that sends statsd counter lines over UDP
pub struct StatsdSink {
    inner: Arc<StatsdInner>,
    flusher: Option<JoinHandle<()>>,
}

struct StatsdInner {
    name: String,
    prefix: String,
    buffered: bool,
    max_packet_size: usize,
    target: SocketAddr,
    socket: UdpSocket,
    buffer: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl StatsdSink {
    /// Validate the configuration, resolve the target and connect a UDP socket
    #[instrument(name = "statsd_sink_connect", skip(name, config), fields(address = %config.address))]
    pub async fn connect(name: impl Into<String>, config: StatsdConfig) -> Result<Self, ContractError> {
        let name = name.into();
        validate(&name, &config)?;

        let target = resolve(&name, &config.address).await?;
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ContractError::sink_connection(&name, format!("bind failed: {e}")))?;
        socket
            .connect(target)
            .await
            .map_err(|e| ContractError::sink_connection(&name, format!("connect to {target} failed: {e}")))?;

        let inner = Arc::new(StatsdInner {
            name,
            prefix: config.prefix.clone(),
            buffered: config.buffered,
            max_packet_size: config.max_packet_size,
            target,
            socket,
            buffer: Mutex::new(Vec::with_capacity(config.max_packet_size)),
            closed: AtomicBool::new(false),
        });

        let flusher = config
            .buffered
            .then(|| spawn_flusher(Arc::clone(&inner), config.flush_interval()));

        debug!(
            sink = %inner.name,
            target = %target,
            buffered = config.buffered,
            "StatsdSink connected"
        );

        Ok(Self { inner, flusher })
    }

    /// Resolved target address
    pub fn target(&self) -> SocketAddr {
        self.inner.target
    }

    /// Render a record as a statsd counter line
    pub fn format_line(&self, record: &CounterRecord) -> Result<String, ContractError> {
        self.inner.format_line(record)
    }
}

impl Drop for StatsdSink {
    fn drop(&mut self) {
        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }
    }
}

impl MetricSink for StatsdSink {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn increment(&self, record: &CounterRecord) -> Result<(), ContractError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ContractError::sink_closed(&self.inner.name));
        }

        let line = self.inner.format_line(record)?;
        if self.inner.buffered {
            self.inner.buffer_line(line.as_bytes()).await
        } else {
            self.inner.send(line.as_bytes()).await
        }
    }

    #[instrument(name = "statsd_sink_flush", skip(self), fields(sink = %self.inner.name))]
    async fn flush(&self) -> Result<(), ContractError> {
        self.inner.flush_buffer().await
    }

    #[instrument(name = "statsd_sink_close", skip(self), fields(sink = %self.inner.name))]
    async fn close(&self) -> Result<(), ContractError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(flusher) = &self.flusher {
            flusher.abort();
        }
        let result = self.inner.flush_buffer().await;
        debug!(sink = %self.inner.name, "StatsdSink closed");
        result
    }
}

impl StatsdInner {
    fn format_line(&self, record: &CounterRecord) -> Result<String, ContractError> {
        if record.name.is_empty() {
            return Err(ContractError::sink_write(&self.name, "empty metric name"));
        }
        if record.name.contains([':', '|', '\n']) {
            return Err(ContractError::sink_write(
                &self.name,
                format!("metric name '{}' contains a reserved character", record.name),
            ));
        }

        let mut line = if self.prefix.is_empty() {
            format!("{}:{}|c", record.name, record.delta)
        } else {
            format!("{}.{}:{}|c", self.prefix, record.name, record.delta)
        };
        if !record.is_always_sampled() {
            line.push_str(&format!("|@{}", record.sample_rate));
        }
        Ok(line)
    }

    async fn buffer_line(&self, line: &[u8]) -> Result<(), ContractError> {
        let mut buffer = self.buffer.lock().await;

        if !buffer.is_empty() && buffer.len() + 1 + line.len() > self.max_packet_size {
            let result = self.send(&buffer).await;
            buffer.clear();
            result?;
        }

        if !buffer.is_empty() {
            buffer.push(b'\n');
        }
        buffer.extend_from_slice(line);

        // A single oversize line still goes out, alone.
        if buffer.len() >= self.max_packet_size {
            let result = self.send(&buffer).await;
            buffer.clear();
            result?;
        }
        Ok(())
    }

    async fn flush_buffer(&self) -> Result<(), ContractError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return Ok(());
        }
        let result = self.send(&buffer).await;
        buffer.clear();
        result
    }

    async fn send(&self, payload: &[u8]) -> Result<(), ContractError> {
        match self.socket.send(payload).await {
            Ok(sent) => {
                trace!(sink = %self.name, bytes = sent, "Sent");
                Ok(())
            }
            Err(e) => Err(ContractError::sink_write(&self.name, format!("UDP send failed: {e}"))),
        }
    }
}

fn spawn_flusher(inner: Arc<StatsdInner>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = inner.flush_buffer().await {
                warn!(sink = %inner.name, error = %e, "Periodic flush failed");
            }
        }
    })
}

fn validate(name: &str, config: &StatsdConfig) -> Result<(), ContractError> {
    if config.address.trim().is_empty() {
        return Err(ContractError::sink_connection(name, "address cannot be empty"));
    }
    if config.max_packet_size == 0 {
        return Err(ContractError::sink_connection(name, "max_packet_size must be > 0"));
    }
    if config.buffered && config.flush_interval_ms == 0 {
        return Err(ContractError::sink_connection(
            name,
            "flush_interval_ms must be > 0 in buffered mode",
        ));
    }
    if config.buffered && config.flush_interval_ms > MAX_INTERVAL_MS {
        return Err(ContractError::sink_connection(
            name,
            format!("flush_interval_ms must be <= {MAX_INTERVAL_MS}"),
        ));
    }
    Ok(())
}

/// Resolve `host:port`; a bare `:port` means the local host
async fn resolve(name: &str, address: &str) -> Result<SocketAddr, ContractError> {
    let address = address.trim();
    let address = if address.starts_with(':') {
        format!("127.0.0.1{address}")
    } else {
        address.to_string()
    };

    let resolved = lookup_host(&address)
        .await
        .map_err(|e| ContractError::sink_connection(name, format!("invalid address '{address}': {e}")))?
        .next()
        .ok_or_else(|| ContractError::sink_connection(name, format!("address '{address}' did not resolve")));
    resolved
}
