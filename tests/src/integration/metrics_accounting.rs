//! # Metrics Accounting Integration
//!
//! Counter identities across the whole stack: every lookup is exactly one
//! of cache hit, cache miss, or filter reject; rates and percentiles come
//! out of the same snapshot the export renders.

#[cfg(test)]
mod tests {
    use meshflow_registry::{LookupEngine, RegistryConfig};
    use meshflow_runtime::{HubConfig, MeshHub};
    use meshflow_telemetry::{CounterSnapshot, ExecEvent, MetricsCollector, NetEventKind, NetTraceEvent};
    use shared_types::{ComponentId, FlowType};
    use std::sync::Arc;
    use std::time::SystemTime;

    #[test]
    fn test_lookup_identity_over_mixed_traffic() {
        let metrics = Arc::new(MetricsCollector::new());
        let engine =
            LookupEngine::new(&RegistryConfig::default(), Arc::clone(&metrics)).expect("engine");

        for i in 0..100u32 {
            engine
                .register_flow(
                    format!("k{i}").as_bytes(),
                    ComponentId::Transport,
                    FlowType::DataTransfer,
                    64,
                    1,
                )
                .expect("register");
        }

        // Mixed traffic: repeat hits, cold hits, and absent keys.
        for i in 0..100u32 {
            engine.lookup(format!("k{}", i % 25).as_bytes()).expect("hit");
        }
        for i in 0..50u32 {
            engine.lookup(format!("missing-{i}").as_bytes()).expect("miss");
        }

        let stats = metrics.snapshot();
        assert_eq!(stats.lookup_count, 150);
        assert_eq!(
            stats.cache_hits + stats.cache_misses,
            stats.lookup_count,
            "hits and misses must partition the lookup count"
        );
        assert!(
            stats.bloom_filter_rejects <= stats.cache_misses,
            "filter rejects are a subset of the misses"
        );
        assert_eq!(stats.registration_count, 100);
        assert_eq!(stats.active_flows, 100);
        assert!(stats.bloom_filter_rejects >= 40, "most absent keys reject at the filter");
    }

    #[test]
    fn test_latency_percentiles_are_coherent() {
        let metrics = Arc::new(MetricsCollector::new());
        let engine =
            LookupEngine::new(&RegistryConfig::default(), Arc::clone(&metrics)).expect("engine");

        engine
            .register_flow(b"warm", ComponentId::Networking, FlowType::HealthCheck, 8, 0)
            .expect("register");
        for _ in 0..1_000 {
            engine.lookup(b"warm").expect("lookup");
        }

        let summary = metrics.snapshot().lookup_latency;
        assert_eq!(summary.count, 1_000);
        assert!(summary.min_ns > 0);
        assert!(summary.p50_ns <= summary.p95_ns);
        assert!(summary.p95_ns <= summary.p99_ns);
        assert!(summary.p99_ns <= summary.max_ns);
        assert!(
            summary.min_ns <= summary.mean_ns && summary.mean_ns <= summary.max_ns,
            "mean bounded by extremes"
        );
    }

    #[test]
    fn test_probe_events_surface_in_export() {
        let metrics = MetricsCollector::new();

        metrics.ingest_exec_event(&ExecEvent {
            pid: 4242,
            uid: 1000,
            comm: "scheduler".into(),
        });
        metrics.ingest_net_event(&NetTraceEvent {
            pid: 4242,
            kind: NetEventKind::Send,
            bytes: 1500,
            at: SystemTime::now(),
        });
        let mut counters = CounterSnapshot::default();
        counters.bytes_per_protocol.insert("tcp".into(), 123_456);
        metrics.ingest_counter_snapshot(&counters);

        let mut buffer = String::new();
        metrics.export_json(&mut buffer).expect("export");
        assert!(buffer.contains("\"exec_events\": 1"));
        assert!(buffer.contains("\"send\""));
        assert!(buffer.contains("123456"));
    }

    #[tokio::test]
    async fn test_hub_stats_and_export_agree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = HubConfig::default();
        config.server.socket_path = dir.path().join("coordination.sock");
        config.liveness.socket_dir = dir.path().to_path_buf();

        let hub = MeshHub::with_config(config).expect("hub");
        hub.register_flow(b"s1", ComponentId::Container, FlowType::ComponentCommand, 32, 2)
            .expect("register");
        hub.lookup(b"s1").expect("lookup");
        hub.lookup(b"absent").expect("lookup");

        let stats = hub.performance_stats();
        assert_eq!(stats.registration_count, 1);
        assert_eq!(stats.lookup_count, 2);
        assert!(stats.uptime_seconds > 0.0);
        assert!(stats.lookups_per_second > 0.0);

        let mut buffer = String::new();
        hub.export_metrics(&mut buffer).expect("export");
        assert!(buffer.contains("\"lookup_count\": 2"));
        assert!(buffer.contains("\"active_flows\": 1"));
    }
}
