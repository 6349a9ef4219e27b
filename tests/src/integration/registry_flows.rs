//! # Registry Pipeline Integration
//!
//! Exercises the full lookup path (filter → cache → matcher) through the
//! public engine API with every digest algorithm and eviction policy.

#[cfg(test)]
mod tests {
    use meshflow_registry::{EvictionPolicy, LookupEngine, RegistryConfig, RegistryError};
    use meshflow_telemetry::MetricsCollector;
    use shared_types::{ComponentId, DigestAlgorithm, FlowType};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine_with(config: RegistryConfig) -> LookupEngine {
        LookupEngine::new(&config, Arc::new(MetricsCollector::new())).expect("valid config")
    }

    // =========================================================================
    // REFERENCE SCENARIO: register k1, look it up, then probe an absent key
    // =========================================================================

    #[test]
    fn test_reference_scenario_register_and_lookup() {
        let engine = engine_with(RegistryConfig::default());

        // register key "k1", transport, data-transfer, size 128, priority 5
        engine
            .register_flow(b"k1", ComponentId::Transport, FlowType::DataTransfer, 128, 5)
            .expect("registration succeeds");

        let record = engine.lookup(b"k1").expect("lookup").expect("k1 present");
        assert_eq!(record.component_id, ComponentId::Transport);
        assert_eq!(record.flow_type, FlowType::DataTransfer);
        assert_eq!(record.size_bytes, 128);
        assert_eq!(record.priority, 5);

        // A key that was never registered is rejected by the filter, not
        // counted as a matcher miss.
        assert!(engine.lookup(b"absent-key").expect("lookup").is_none());
        let stats = engine.metrics().snapshot();
        assert_eq!(stats.bloom_filter_rejects, 1);
        assert_eq!(stats.matcher_misses, 0);
    }

    #[test]
    fn test_authoritative_answer_under_every_digest() {
        for algorithm in [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Murmur3,
            DigestAlgorithm::SipHash24,
        ] {
            let mut config = RegistryConfig::default();
            config.matcher.digest_algorithm = algorithm;
            let engine = engine_with(config);

            // Mixed short and long keys.
            let keys: Vec<Vec<u8>> = (0..64u8)
                .map(|i| {
                    if i % 2 == 0 {
                        format!("short-{i}").into_bytes()
                    } else {
                        vec![i; 48]
                    }
                })
                .collect();

            for (i, key) in keys.iter().enumerate() {
                engine
                    .register_flow(
                        key,
                        ComponentId::Networking,
                        FlowType::EventNotification,
                        i as u64,
                        (i % 8) as u8,
                    )
                    .expect("register");
            }

            for (i, key) in keys.iter().enumerate() {
                let record = engine
                    .lookup(key)
                    .expect("lookup")
                    .unwrap_or_else(|| panic!("{algorithm:?}: key {i} lost"));
                assert_eq!(record.size_bytes, i as u64);
            }
        }
    }

    #[test]
    fn test_every_policy_respects_cache_bound_under_load() {
        for policy in [
            EvictionPolicy::Lru,
            EvictionPolicy::Lfu,
            EvictionPolicy::Fifo,
            EvictionPolicy::Random,
        ] {
            let mut config = RegistryConfig::default();
            config.cache.max_entries = 32;
            config.cache.eviction_policy = policy;
            let engine = engine_with(config);

            for i in 0..500u32 {
                engine
                    .register_flow(
                        format!("flow-{i}").as_bytes(),
                        ComponentId::Container,
                        FlowType::DataTransfer,
                        64,
                        1,
                    )
                    .expect("register");
            }

            // The cache stayed bounded; the matcher kept everything.
            let stats = engine.metrics().snapshot();
            assert!(
                stats.cache_entries <= 32,
                "{policy:?}: cache grew past its bound: {}",
                stats.cache_entries
            );
            assert_eq!(engine.active_flows(), 500);

            // Every key still answers, cached or not.
            for i in 0..500u32 {
                assert!(
                    engine
                        .lookup(format!("flow-{i}").as_bytes())
                        .expect("lookup")
                        .is_some(),
                    "{policy:?}: flow-{i} lost"
                );
            }
        }
    }

    #[test]
    fn test_matcher_capacity_is_independent_of_cache_bound() {
        let mut config = RegistryConfig::default();
        config.matcher.max_entries = 4;
        config.cache.max_entries = 100;
        let engine = engine_with(config);

        for i in 0..4 {
            engine
                .register_flow(
                    format!("k{i}").as_bytes(),
                    ComponentId::Consensus,
                    FlowType::ComponentCommand,
                    8,
                    0,
                )
                .expect("register");
        }

        let err = engine
            .register_flow(b"k4", ComponentId::Consensus, FlowType::ComponentCommand, 8, 0)
            .unwrap_err();
        assert_eq!(err, RegistryError::CapacityExceeded { capacity: 4 });
        assert_eq!(engine.active_flows(), 4);
    }

    #[test]
    fn test_ttl_expires_entries_without_eviction_pressure() {
        let mut config = RegistryConfig::default();
        config.cache.ttl_seconds = 1;
        let engine = engine_with(config);

        engine
            .register_flow(b"ephemeral", ComponentId::Security, FlowType::SecurityEvent, 32, 7)
            .expect("register");

        // Immediately cached.
        assert!(engine.lookup(b"ephemeral").expect("lookup").is_some());
        assert!(engine.metrics().snapshot().cache_hits >= 1);

        std::thread::sleep(Duration::from_millis(1_100));

        // The cache entry aged out; the matcher still answers, and the
        // lookup is a cache miss that repopulates.
        assert!(engine.lookup(b"ephemeral").expect("lookup").is_some());
        let stats = engine.metrics().snapshot();
        assert!(stats.cache_expired >= 1, "TTL purge should be counted");
        assert!(stats.matcher_hits >= 1);
    }

    #[test]
    fn test_bloom_rotation_under_sustained_growth() {
        let mut config = RegistryConfig::default();
        config.bloom.expected_entries = 64;
        config.bloom.max_generations = 6;
        let engine = engine_with(config);

        for i in 0..2_000u32 {
            engine
                .register_flow(
                    format!("grow-{i}").as_bytes(),
                    ComponentId::Orchestration,
                    FlowType::MetricsCollection,
                    16,
                    2,
                )
                .expect("register");
        }

        let stats = engine.metrics().snapshot();
        assert!(
            stats.bloom_generations > 1,
            "sustained growth should rotate generations"
        );
        assert!(stats.bloom_generations <= 6, "rotation respects the cap");

        // The invariant that matters: no registered key is ever filtered out.
        for i in 0..2_000u32 {
            assert!(
                engine
                    .lookup(format!("grow-{i}").as_bytes())
                    .expect("lookup")
                    .is_some(),
                "grow-{i} lost to a false negative"
            );
        }
    }

    #[test]
    fn test_concurrent_workers_disjoint_keys() {
        let engine = Arc::new(engine_with(RegistryConfig::default()));
        let workers = 16usize;
        let per_worker = 500usize;

        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..per_worker {
                        engine
                            .register_flow(
                                format!("w{w}-k{i}").as_bytes(),
                                ComponentId::Transport,
                                FlowType::DataTransfer,
                                128,
                                5,
                            )
                            .expect("register");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }

        assert_eq!(
            engine.active_flows(),
            workers * per_worker,
            "active_flows equals successful registrations"
        );
        for w in 0..workers {
            for i in 0..per_worker {
                assert!(
                    engine
                        .lookup(format!("w{w}-k{i}").as_bytes())
                        .expect("lookup")
                        .is_some(),
                    "w{w}-k{i} lost"
                );
            }
        }
    }
}
