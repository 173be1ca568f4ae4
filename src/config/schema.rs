//! Configuration schema definitions.
//!
//! This module defines the agent configuration file. All types derive Serde
//! traits for deserialization from TOML; every section is optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;

/// Root configuration for the proxy agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Worker threads and topology source.
    pub agent: AgentSection,

    /// Process default behavior, inherited by every pool.
    pub behavior: Behavior,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// How topology updates are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEncoding {
    /// `pools` / `bindings` / `pool-*` / `svr-*` / `behavior-*` keys.
    #[default]
    KeyValues,
    /// A JSON document under `contents`.
    Document,
}

/// Agent section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentSection {
    /// Total threads, the control thread included.
    pub worker_threads: usize,

    /// Encoding of the topology file.
    pub encoding: ConfigEncoding,

    /// Topology file delivered to the ingestion entry point.
    pub topology_path: Option<PathBuf>,

    /// Host proxies bind their listen ports on.
    pub listen_host: String,

    /// Reload the topology file when it changes.
    pub watch: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            encoding: ConfigEncoding::KeyValues,
            topology_path: None,
            listen_host: "0.0.0.0".to_string(),
            watch: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.agent.worker_threads, 4);
        assert_eq!(config.agent.encoding, ConfigEncoding::KeyValues);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_full_config() {
        let config: AgentConfig = toml::from_str(
            r#"
            [agent]
            worker_threads = 8
            encoding = "document"
            topology_path = "/etc/kv-proxy/topology.json"

            [behavior]
            port_listen = 11211
            downstream_max = 4
            front_cache_spec = "user:"

            [admin]
            enabled = true
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.worker_threads, 8);
        assert_eq!(config.agent.encoding, ConfigEncoding::Document);
        assert_eq!(config.behavior.port_listen, 11211);
        assert_eq!(config.behavior.front_cache_spec, "user:");
        assert_eq!(config.admin.api_key, "secret");
        assert_eq!(config.agent.listen_host, "0.0.0.0");
    }
}
