//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件到 dispatcher 的装配
//! - 针对本地 statsd 监听端口的真实 UDP 发送
//! - 基于 recording sink 的 dispatcher 策略

#[cfg(test)]
mod contract_tests {
    use contracts::{CounterRecord, LoadgenConfig};

    #[test]
    fn test_contracts_compile() {
        let record = CounterRecord::for_index(7);
        assert_eq!(record.name, "7");
        assert_eq!(record.delta, 7);
        assert!(record.is_always_sampled());
        let _ = LoadgenConfig::default();
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EmitterConfig, LoadgenConfig, UnknownReceiverPolicy};
    use dispatcher::{
        Dispatcher, DispatcherError, EmissionRequest, PacedStrategy, StrategyRegistry,
    };
    use emitter::RecordingConnector;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    /// 持续接收数据报直到 socket 静默，并按行拆分
    async fn collect_lines(socket: &UdpSocket) -> Vec<String> {
        let mut lines = Vec::new();
        let mut buf = vec![0u8; 65_536];
        while let Ok(Ok(n)) = timeout(Duration::from_millis(300), socket.recv(&mut buf)).await {
            let payload = String::from_utf8_lossy(&buf[..n]).to_string();
            lines.extend(payload.split('\n').map(str::to_string));
        }
        lines
    }

    fn line_counts(lines: &[String]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for line in lines {
            *counts.entry(line.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// End-to-end: TOML config -> Dispatcher -> StatsdSink -> UDP listener
    ///
    /// 350ms 内每 100ms 一个 tick，共三批 `rate` 个 increment。
    #[tokio::test]
    async fn test_e2e_statsd_over_udp() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let content = format!(
            r#"
[statsd]
address = ":{port}"
prefix = "statsd"
buffered = true
flush_interval_ms = 20

[emitter]
tick_interval_ms = 100
"#
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_config(&config);

        let rate = 5;
        let report = dispatcher
            .dispatch(EmissionRequest::new(
                "statsd",
                Duration::from_millis(350),
                rate,
            ))
            .await
            .unwrap()
            .expect("statsd is registered");

        assert_eq!(report.ticks, 3);
        assert_eq!(report.increments_scheduled, 3 * rate);
        assert_eq!(report.increments_sent, 3 * rate);
        assert_eq!(report.increments_failed, 0);

        let lines = collect_lines(&listener).await;
        assert_eq!(lines.len(), (3 * rate) as usize);

        let counts = line_counts(&lines);
        for i in 0..rate {
            assert_eq!(counts.get(&format!("statsd.{i}:{i}|c")), Some(&3));
        }
    }

    #[tokio::test]
    async fn test_e2e_unbuffered_statsd() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = LoadgenConfig::default();
        config.statsd.address = addr.to_string();
        config.statsd.prefix = "bench".into();
        config.statsd.buffered = false;
        config.emitter.tick_interval_ms = 50;

        dispatcher::Dispatcher::from_config(&config)
            .run("statsd", Duration::from_millis(75), 3)
            .await
            .unwrap();

        let lines = collect_lines(&listener).await;
        let counts = line_counts(&lines);
        assert_eq!(lines.len(), 3);
        for i in 0..3 {
            assert_eq!(counts.get(&format!("bench.{i}:{i}|c")), Some(&1));
        }
    }

    #[tokio::test]
    async fn test_e2e_log_receiver() {
        let mut config = LoadgenConfig::default();
        config.emitter.tick_interval_ms = 50;

        let report = Dispatcher::from_config(&config)
            .dispatch(EmissionRequest::new("log", Duration::from_millis(125), 4))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.receiver, "log");
        assert_eq!(report.ticks, 2);
        assert_eq!(report.increments_sent, 8);
    }

    fn recording_dispatcher(
        connector: RecordingConnector,
        tick_ms: u64,
        policy: UnknownReceiverPolicy,
    ) -> Dispatcher {
        let mut config = LoadgenConfig::default();
        config.dispatcher.unknown_receiver = policy;

        let mut registry = StrategyRegistry::new();
        registry.register(PacedStrategy::new(
            "recording",
            connector,
            EmitterConfig {
                tick_interval_ms: tick_ms,
                ..EmitterConfig::default()
            },
        ));
        Dispatcher::new(registry, config.dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_with_recording_sink() {
        let connector = RecordingConnector::new();
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, 60_000, UnknownReceiverPolicy::Ignore);

        dispatcher
            .run("recording", Duration::from_secs(185), 100)
            .await
            .unwrap();

        assert_eq!(state.record_count(), 300);
        assert_eq!(state.opened(), 1);
        assert_eq!(state.closed(), 1);

        let mut values = state.values();
        values.sort_unstable();
        let expected: Vec<i64> = (0..100).flat_map(|v| [v, v, v]).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_failure_surfaces() {
        let connector = RecordingConnector::failing("connection refused");
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, 1_000, UnknownReceiverPolicy::Ignore);

        let err = dispatcher
            .run("recording", Duration::from_secs(5), 10)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatcherError::Emission(_)));
        assert_eq!(state.record_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failures_do_not_fail_run() {
        let connector = RecordingConnector::new().with_failing_writes();
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, 1_000, UnknownReceiverPolicy::Ignore);

        let report = dispatcher
            .dispatch(EmissionRequest::new(
                "recording",
                Duration::from_millis(2_500),
                4,
            ))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.increments_failed, 8);
        assert_eq!(report.increments_sent, 0);
        assert_eq!(state.closed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_receiver_policies() {
        let ignore = recording_dispatcher(
            RecordingConnector::new(),
            1_000,
            UnknownReceiverPolicy::Ignore,
        );
        let outcome = ignore
            .dispatch(EmissionRequest::new("kafka", Duration::from_secs(60), 10))
            .await
            .unwrap();
        assert!(outcome.is_none());

        let reject = recording_dispatcher(
            RecordingConnector::new(),
            1_000,
            UnknownReceiverPolicy::Reject,
        );
        let err = reject
            .run("kafka", Duration::from_secs(60), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::UnknownReceiver { .. }));
    }

    #[tokio::test]
    async fn test_start_sending_metrics_unknown_receiver() {
        dispatcher::start_sending_metrics("nonexistent", Duration::from_secs(3600), 1000)
            .await
            .unwrap();
    }

    #[test]
    fn test_config_round_trip_through_loader() {
        let mut config = LoadgenConfig::default();
        config.statsd.address = "10.1.2.3:8125".into();
        config.emitter.max_in_flight = 8;
        config.dispatcher.unknown_receiver = UnknownReceiverPolicy::Reject;

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded, config);
    }
}
