//! # Coordination Socket Integration
//!
//! Real unix-socket round trips: hello handshakes, flow operations over
//! the wire, relays between two connected components, and bulkhead
//! behavior toward disconnected peers.

#[cfg(test)]
mod tests {
    use meshflow_coordination::{
        ComponentRegistry, CoordinationClient, CoordinationError, CoordinationServer,
        ServerSettings,
    };
    use meshflow_registry::{LookupEngine, RegistryConfig};
    use meshflow_telemetry::MetricsCollector;
    use shared_types::{ComponentId, ComponentStatus, FlowType, ResultCode};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const MAX_FRAME: usize = 16 * 1024;

    struct Harness {
        server: CoordinationServer,
        registry: Arc<ComponentRegistry>,
        metrics: Arc<MetricsCollector>,
        socket: PathBuf,
        _dir: tempfile::TempDir,
    }

    async fn start_harness() -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("coordination.sock");
        let metrics = Arc::new(MetricsCollector::new());
        let engine = Arc::new(
            LookupEngine::new(&RegistryConfig::default(), Arc::clone(&metrics)).expect("engine"),
        );
        let registry = Arc::new(ComponentRegistry::new());
        let server = CoordinationServer::new(
            ServerSettings {
                socket_path: socket.clone(),
                max_connections: 8,
                buffer_size: MAX_FRAME,
                timeout_ms: 500,
            },
            engine,
            Arc::clone(&registry),
            Arc::clone(&metrics),
        );
        server.start().await.expect("server start");
        Harness {
            server,
            registry,
            metrics,
            socket,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_hello_registers_component() {
        let harness = start_harness().await;

        let _client = CoordinationClient::connect(
            &harness.socket,
            ComponentId::Scheduler,
            Some(std::process::id()),
            MAX_FRAME,
        )
        .await
        .expect("connect");

        let info = harness
            .registry
            .get(ComponentId::Scheduler)
            .expect("registered by hello");
        assert_eq!(info.status, ComponentStatus::Starting);
        assert_eq!(info.pid, Some(std::process::id()));

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_flow_operations_over_the_wire() {
        let harness = start_harness().await;
        let mut client =
            CoordinationClient::connect(&harness.socket, ComponentId::Transport, None, MAX_FRAME)
                .await
                .expect("connect");

        client
            .register_flow(b"wire-k1", FlowType::DataTransfer, 128, 5)
            .await
            .expect("register");

        let record = client
            .lookup(b"wire-k1")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(record.component_id, ComponentId::Transport);
        assert_eq!(record.size_bytes, 128);

        assert!(client.lookup(b"wire-absent").await.expect("lookup").is_none());

        assert!(client.remove_flow(b"wire-k1").await.expect("remove"));
        assert!(!client.remove_flow(b"wire-k1").await.expect("remove again"));

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_invalid_parameters_reported_over_the_wire() {
        let harness = start_harness().await;
        let mut client =
            CoordinationClient::connect(&harness.socket, ComponentId::Transport, None, MAX_FRAME)
                .await
                .expect("connect");

        let err = client
            .register_flow(b"bad", FlowType::DataTransfer, 1, 9)
            .await
            .unwrap_err();
        match err {
            CoordinationError::Remote { code, .. } => {
                assert_eq!(code, ResultCode::InvalidParameter);
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        let err = client
            .register_flow(b"", FlowType::DataTransfer, 1, 1)
            .await
            .unwrap_err();
        match err {
            CoordinationError::Remote { code, .. } => assert_eq!(code, ResultCode::InvalidKey),
            other => panic!("expected remote error, got {other:?}"),
        }

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_relay_between_connected_components() {
        let harness = start_harness().await;
        let mut sender =
            CoordinationClient::connect(&harness.socket, ComponentId::Security, None, MAX_FRAME)
                .await
                .expect("sender connect");
        let mut receiver =
            CoordinationClient::connect(&harness.socket, ComponentId::Scheduler, None, MAX_FRAME)
                .await
                .expect("receiver connect");

        sender
            .coordinate(ComponentId::Scheduler, b"rebalance-now".to_vec())
            .await
            .expect("relay delivered");

        let (from, payload) = timeout(Duration::from_secs(1), receiver.recv_relayed())
            .await
            .expect("timely")
            .expect("relayed frame");
        assert_eq!(from, ComponentId::Security);
        assert_eq!(payload, b"rebalance-now");

        let stats = harness.metrics.snapshot();
        assert_eq!(stats.coordination_count, 1);
        assert_eq!(stats.relay_delivered, 1);

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_relay_to_disconnected_peer_fails_fast() {
        let harness = start_harness().await;
        let mut sender =
            CoordinationClient::connect(&harness.socket, ComponentId::Security, None, MAX_FRAME)
                .await
                .expect("connect");

        let err = sender
            .coordinate(ComponentId::Networking, b"anyone-there".to_vec())
            .await
            .unwrap_err();
        match err {
            CoordinationError::Remote { code, .. } => {
                assert_eq!(code, ResultCode::PeerUnreachable);
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        // The failed relay is counted, and the sender's connection is
        // still perfectly usable (bulkhead isolation).
        assert_eq!(harness.metrics.snapshot().relay_failed, 1);
        sender.heartbeat().await.expect("connection still live");

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_heartbeats_promote_and_sweeps_fail() {
        let harness = start_harness().await;
        let mut client =
            CoordinationClient::connect(&harness.socket, ComponentId::Container, None, MAX_FRAME)
                .await
                .expect("connect");

        client.heartbeat().await.expect("heartbeat");
        assert_eq!(
            harness
                .registry
                .get(ComponentId::Container)
                .expect("known")
                .status,
            ComponentStatus::Running,
            "first heartbeat promotes starting to running"
        );

        // Force a timeout sweep; the connected-but-silent component fails.
        harness.registry.heartbeat_sweep(Duration::ZERO);
        assert_eq!(
            harness
                .registry
                .get(ComponentId::Container)
                .expect("known")
                .status,
            ComponentStatus::Failed
        );

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_stats_over_the_wire() {
        let harness = start_harness().await;
        let mut client =
            CoordinationClient::connect(&harness.socket, ComponentId::Networking, None, MAX_FRAME)
                .await
                .expect("connect");

        client
            .register_flow(b"stat-k", FlowType::MetricsCollection, 8, 1)
            .await
            .expect("register");
        client.lookup(b"stat-k").await.expect("lookup");

        let stats = client.stats().await.expect("stats");
        assert_eq!(stats.registration_count, 1);
        assert_eq!(stats.lookup_count, 1);
        assert_eq!(stats.active_flows, 1);

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_one_slow_peer_does_not_block_others() {
        let harness = start_harness().await;

        // The slow peer connects and then never reads its socket.
        let _slow =
            CoordinationClient::connect(&harness.socket, ComponentId::Consensus, None, MAX_FRAME)
                .await
                .expect("slow connect");

        let mut sender =
            CoordinationClient::connect(&harness.socket, ComponentId::Security, None, MAX_FRAME)
                .await
                .expect("sender connect");
        let mut other =
            CoordinationClient::connect(&harness.socket, ComponentId::Scheduler, None, MAX_FRAME)
                .await
                .expect("other connect");

        // Flood the slow peer far past its outbound queue and the socket
        // buffer. Every call must return promptly: delivered into the
        // queue or refused, never blocked on the stalled reader.
        let mut refused = 0usize;
        for i in 0..500u32 {
            match timeout(
                Duration::from_secs(1),
                sender.coordinate(ComponentId::Consensus, vec![0u8; 8 * 1024]),
            )
            .await
            .expect("coordinate never hangs")
            {
                Ok(()) => {}
                Err(CoordinationError::Remote { code, .. }) => {
                    assert_eq!(code, ResultCode::PeerUnreachable, "flood round {i}");
                    refused += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(refused > 0, "the bounded queue must eventually refuse");

        // A third party is completely unaffected.
        sender
            .coordinate(ComponentId::Scheduler, b"still-works".to_vec())
            .await
            .expect("healthy peer reachable");
        let (_, payload) = timeout(Duration::from_secs(1), other.recv_relayed())
            .await
            .expect("timely")
            .expect("relayed");
        assert_eq!(payload, b"still-works");

        harness.server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_connection_limit_refuses_excess_peers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("coordination.sock");
        let metrics = Arc::new(MetricsCollector::new());
        let engine = Arc::new(
            LookupEngine::new(&RegistryConfig::default(), Arc::clone(&metrics)).expect("engine"),
        );
        let registry = Arc::new(ComponentRegistry::new());
        let server = CoordinationServer::new(
            ServerSettings {
                socket_path: socket.clone(),
                max_connections: 1,
                buffer_size: MAX_FRAME,
                timeout_ms: 500,
            },
            engine,
            registry,
            metrics,
        );
        server.start().await.expect("start");

        let _first = CoordinationClient::connect(&socket, ComponentId::Transport, None, MAX_FRAME)
            .await
            .expect("first connection fits");

        // Give the accept loop a beat to account for the first connection.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second =
            CoordinationClient::connect(&socket, ComponentId::Consensus, None, MAX_FRAME).await;
        assert!(second.is_err(), "second connection must be refused");

        server.stop().await.expect("stop");
    }
}
