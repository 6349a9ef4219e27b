//! # Component Lifecycle Integration
//!
//! The specified lifecycle scenario end to end: discovery admits a
//! component in `Starting`, the first heartbeat promotes it to `Running`,
//! and heartbeat absence beyond the timeout fails it with exactly one
//! notification.

#[cfg(test)]
mod tests {
    use meshflow_coordination::{ComponentRegistry, RegistrySettings};
    use meshflow_runtime::{HubConfig, MeshHub};
    use shared_types::{ComponentId, ComponentStatus};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_discovery_heartbeat_failure_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = ComponentRegistry::new();
        let mut events = registry.events().subscribe();

        // Discovery: a scheduler socket appears and is admitted Starting.
        std::fs::write(dir.path().join("scheduler.sock"), b"").expect("socket file");
        registry.discovery_sweep(dir.path(), None);

        let admitted = events.recv().await.expect("admission event");
        assert_eq!(admitted.component_id, ComponentId::Scheduler);
        assert_eq!(admitted.old, ComponentStatus::Unknown);
        assert_eq!(admitted.new, ComponentStatus::Starting);

        // First heartbeat: Starting -> Running.
        assert!(registry.heartbeat(ComponentId::Scheduler));
        let promoted = events.recv().await.expect("promotion event");
        assert_eq!(promoted.old, ComponentStatus::Starting);
        assert_eq!(promoted.new, ComponentStatus::Running);

        // Heartbeat absent beyond the timeout: Running -> Failed, once.
        registry.heartbeat_sweep(Duration::ZERO);
        registry.heartbeat_sweep(Duration::ZERO);

        let failed = timeout(Duration::from_millis(200), events.recv())
            .await
            .expect("timely")
            .expect("failure event");
        assert_eq!(failed.old, ComponentStatus::Running);
        assert_eq!(failed.new, ComponentStatus::Failed);
        assert_eq!(
            events.try_recv().expect("bus open"),
            None,
            "exactly one failure notification"
        );
    }

    #[tokio::test]
    async fn test_background_sweeps_drive_the_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Arc::new(ComponentRegistry::new());
        let mut events = registry.events().subscribe();

        let settings = RegistrySettings {
            discovery_interval_seconds: 1,
            heartbeat_timeout_seconds: 1,
            socket_dir: dir.path().to_path_buf(),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = registry.spawn_sweeps(
            settings,
            shutdown_rx,
            dir.path().join("coordination.sock"),
        );

        // Drop a socket file and let the discovery sweep find it.
        std::fs::write(dir.path().join("networking.sock"), b"").expect("socket file");

        let admitted = timeout(Duration::from_secs(3), events.recv())
            .await
            .expect("discovery sweep ran")
            .expect("admission event");
        assert_eq!(admitted.component_id, ComponentId::Networking);
        assert_eq!(admitted.new, ComponentStatus::Starting);

        // Never heartbeats, so the heartbeat sweep fails it.
        let failed = timeout(Duration::from_secs(3), events.recv())
            .await
            .expect("heartbeat sweep ran")
            .expect("failure event");
        assert_eq!(failed.component_id, ComponentId::Networking);
        assert_eq!(failed.new, ComponentStatus::Failed);

        let _ = shutdown_tx.send(true);
        for handle in handles {
            let _ = timeout(Duration::from_secs(1), handle).await;
        }
    }

    #[tokio::test]
    async fn test_hub_status_subscription_surface() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = HubConfig::default();
        config.server.socket_path = dir.path().join("coordination.sock");
        config.liveness.socket_dir = dir.path().to_path_buf();
        config.liveness.discovery_interval_seconds = 3600;
        config.liveness.heartbeat_timeout_seconds = 3600;

        let hub = MeshHub::with_config(config).expect("hub");
        hub.start().await.expect("start");

        let mut sub = hub.subscribe_status();
        let registry = Arc::clone(hub.component_registry());
        registry
            .register_component(ComponentId::Transport, dir.path().join("transport.sock"), None)
            .expect("admit");

        let event = timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timely")
            .expect("event");
        assert_eq!(event.component_id, ComponentId::Transport);

        // get_components surface: truncation plus true total.
        registry
            .register_component(ComponentId::Consensus, dir.path().join("consensus.sock"), None)
            .expect("admit");
        let (listed, total) = hub.components(1);
        assert_eq!(listed.len(), 1);
        assert_eq!(total, 2);

        hub.stop().await.expect("stop");
    }
}
