//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the worker pool and the proxy registry
//! - Open the null bucket on the default listen port
//! - Deliver the initial topology and wait for it to be reconciled
//!
//! # Design Decisions
//! - Fail fast: a missing or empty topology is fatal at startup
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;

use crate::config::{load_topology, AgentConfig, ConfigError};
use crate::error::AgentError;
use crate::proxy::{ProxyListener, ProxyMain};
use crate::work::WorkerPool;

/// Build the registry and apply the initial topology.
///
/// Must run outside the worker pool; it blocks until the first pass is done.
pub fn start_agent(
    config: &AgentConfig,
    listener: Arc<dyn ProxyListener>,
) -> Result<Arc<ProxyMain>, AgentError> {
    let path = config
        .agent
        .topology_path
        .as_deref()
        .ok_or(AgentError::MissingConfig)?;

    let update = match load_topology(path, config.agent.encoding) {
        Ok(update) => update,
        Err(ConfigError::EmptyTopology(_)) => return Err(AgentError::EmptyConfig),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AgentError::MissingConfig)
        }
        Err(e) => return Err(AgentError::Topology(e)),
    };

    let workers = Arc::new(WorkerPool::start(config.agent.worker_threads)?);
    let main = Arc::new(ProxyMain::new(
        config.behavior.clone(),
        config.agent.encoding,
        workers,
        listener,
    ));

    if main.init_null_bucket() {
        tracing::info!(port = config.behavior.port_listen, "Null bucket listening");
    }

    main.on_new_config(update)?;
    tracing::info!(proxies = main.proxies().len(), "Initial topology applied");

    Ok(main)
}
