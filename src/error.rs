//! Error taxonomy for configuration ingestion and reconciliation.
//!
//! Whole-update errors (`MissingPools`, `MismatchedBindings`, `MissingContents`,
//! `BadDocument`) are detected before any proxy is touched and count as a
//! config failure. Per-pool errors skip that pool only.

use crate::proxy::ListenError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No topology source configured at startup.
    #[error("missing configuration")]
    MissingConfig,

    /// The topology source is empty at startup.
    #[error("empty configuration")]
    EmptyConfig,

    #[error("bad topology: {0}")]
    Topology(#[source] crate::config::ConfigError),

    #[error("update has no pools key")]
    MissingPools,

    #[error("{pools} pools but {bindings} bindings")]
    MismatchedBindings { pools: usize, bindings: usize },

    #[error("malformed pool {pool:?}: {reason}")]
    MalformedPool { pool: String, reason: &'static str },

    #[error("update has no contents key")]
    MissingContents,

    #[error("bad configuration document: {0}")]
    BadDocument(#[from] serde_json::Error),

    #[error("bad server document for bucket {bucket}: {reason}")]
    BadServerDocument { bucket: String, reason: String },

    #[error("proxy {name} failed to listen on {port}: {source}")]
    Listen {
        name: String,
        port: u16,
        #[source]
        source: ListenError,
    },

    #[error("control thread unavailable: {0}")]
    Work(#[from] crate::work::WorkError),
}
