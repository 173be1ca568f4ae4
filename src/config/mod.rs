//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! agent config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!
//! topology file (TOML table or JSON document)
//!     → loader.rs load_topology → KvPairs
//!     → agent ingestion
//!
//! On change or SIGHUP:
//!     watcher.rs detects change
//!     → loader.rs reloads the topology
//!     → KvPairs queued for the ingestion loop
//! ```
//!
//! # Design Decisions
//! - The agent config is immutable once loaded; only the topology reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_topology, ConfigError};
pub use schema::{AdminConfig, AgentConfig, AgentSection, ConfigEncoding, ObservabilityConfig};
pub use validation::ValidationError;
pub use watcher::TopologyWatcher;
