//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (threads, addresses, cache settings)
//! - Check the topology source is usable for the chosen encoding
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{AgentConfig, ConfigEncoding};

/// Upper bound on the worker pool size.
pub const MAX_WORKER_THREADS: usize = 256;

/// A single semantic problem in the agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("agent.worker_threads must be between 1 and {max}, got {got}")]
    WorkerThreads { got: usize, max: usize },

    #[error("agent.listen_host must not be empty")]
    EmptyListenHost,

    #[error("{field} is not a valid socket address: {value}")]
    BadAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,

    #[error("document encoding needs behavior.port_listen")]
    DocumentWithoutPort,

    #[error("behavior.{field} is set but behavior.{other} is zero")]
    HalfCache {
        field: &'static str,
        other: &'static str,
    },
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let threads = config.agent.worker_threads;
    if threads == 0 || threads > MAX_WORKER_THREADS {
        errors.push(ValidationError::WorkerThreads {
            got: threads,
            max: MAX_WORKER_THREADS,
        });
    }

    if config.agent.listen_host.trim().is_empty() {
        errors.push(ValidationError::EmptyListenHost);
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    if config.agent.encoding == ConfigEncoding::Document && config.behavior.port_listen == 0 {
        errors.push(ValidationError::DocumentWithoutPort);
    }

    let b = &config.behavior;
    if (b.front_cache_max > 0) != (b.front_cache_lifespan > 0) {
        errors.push(half_cache(b.front_cache_max > 0, "front_cache_max", "front_cache_lifespan"));
    }
    if (b.key_stats_max > 0) != (b.key_stats_lifespan > 0) {
        errors.push(half_cache(b.key_stats_max > 0, "key_stats_max", "key_stats_lifespan"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn half_cache(max_set: bool, max: &'static str, lifespan: &'static str) -> ValidationError {
    if max_set {
        ValidationError::HalfCache { field: max, other: lifespan }
    } else {
        ValidationError::HalfCache { field: lifespan, other: max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&AgentConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AgentConfig::default();
        config.agent.worker_threads = 0;
        config.agent.encoding = ConfigEncoding::Document;
        config.admin.enabled = true;
        config.admin.bind_address = "nope".to_string();
        config.behavior.key_stats_lifespan = 1000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::MissingApiKey));
        assert!(errors.contains(&ValidationError::DocumentWithoutPort));
        assert!(errors.contains(&ValidationError::HalfCache {
            field: "key_stats_lifespan",
            other: "key_stats_max",
        }));
    }
}
