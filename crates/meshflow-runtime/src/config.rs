//! Hub configuration: aggregation, defaults, and environment overrides.

use meshflow_coordination::{RegistrySettings, ServerSettings};
use meshflow_registry::{EvictionPolicy, RegistryConfig};
use serde::{Deserialize, Serialize};
use shared_types::ComponentId;
use std::path::PathBuf;
use tracing::warn;

/// Complete configuration for a hub instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubConfig {
    /// Role the embedding process speaks as for locally originated
    /// coordination messages.
    pub component_id: ComponentId,
    /// Worker threads for the runtime binary; 0 keeps the tokio default.
    pub worker_threads: usize,
    /// Socket server settings.
    pub server: ServerSettings,
    /// Matcher, filter, and cache settings.
    pub registry: RegistryConfig,
    /// Discovery and heartbeat sweep settings.
    pub liveness: RegistrySettings,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            component_id: ComponentId::Orchestration,
            worker_threads: 0,
            server: ServerSettings::default(),
            registry: RegistryConfig::default(),
            liveness: RegistrySettings::default(),
        }
    }
}

impl HubConfig {
    /// Defaults overridden from `MESHFLOW_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MESHFLOW_SOCKET_PATH") {
            config.server.socket_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("MESHFLOW_SOCKET_DIR") {
            config.liveness.socket_dir = PathBuf::from(dir);
        }
        if let Ok(role) = std::env::var("MESHFLOW_COMPONENT") {
            match ComponentId::from_name(&role) {
                Some(id) => config.component_id = id,
                None => warn!(%role, "MESHFLOW_COMPONENT not a known role"),
            }
        }
        if let Ok(policy) = std::env::var("MESHFLOW_CACHE_POLICY") {
            config.registry.cache.eviction_policy = match policy.as_str() {
                "lru" => EvictionPolicy::Lru,
                "lfu" => EvictionPolicy::Lfu,
                "fifo" => EvictionPolicy::Fifo,
                "random" => EvictionPolicy::Random,
                other => {
                    warn!(policy = other, "MESHFLOW_CACHE_POLICY not recognized");
                    config.registry.cache.eviction_policy
                }
            };
        }

        Self::env_number("MESHFLOW_WORKER_THREADS", &mut config.worker_threads);
        Self::env_number("MESHFLOW_MAX_CONNECTIONS", &mut config.server.max_connections);
        Self::env_number("MESHFLOW_BUFFER_SIZE", &mut config.server.buffer_size);
        Self::env_number("MESHFLOW_TIMEOUT_MS", &mut config.server.timeout_ms);
        Self::env_number(
            "MESHFLOW_MATCHER_MAX_ENTRIES",
            &mut config.registry.matcher.max_entries,
        );
        Self::env_number(
            "MESHFLOW_CACHE_MAX_ENTRIES",
            &mut config.registry.cache.max_entries,
        );
        Self::env_number(
            "MESHFLOW_CACHE_TTL_SECS",
            &mut config.registry.cache.ttl_seconds,
        );
        Self::env_number(
            "MESHFLOW_DISCOVERY_INTERVAL_SECS",
            &mut config.liveness.discovery_interval_seconds,
        );
        Self::env_number(
            "MESHFLOW_HEARTBEAT_TIMEOUT_SECS",
            &mut config.liveness.heartbeat_timeout_seconds,
        );

        config
    }

    fn env_number<T: std::str::FromStr>(name: &str, slot: &mut T) {
        if let Ok(raw) = std::env::var(name) {
            match raw.parse() {
                Ok(value) => *slot = value,
                Err(_) => warn!(var = name, value = %raw, "ignoring unparseable override"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = HubConfig::default();
        assert_eq!(config.component_id, ComponentId::Orchestration);
        assert!(config.registry.validate().is_ok());
        assert!(config.server.max_connections > 0);
    }

    #[test]
    fn test_config_survives_json() {
        let config = HubConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: HubConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.server.socket_path, config.server.socket_path);
        assert_eq!(
            back.liveness.heartbeat_timeout_seconds,
            config.liveness.heartbeat_timeout_seconds
        );
    }
}
