//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::KvPairs;
use crate::config::schema::{AgentConfig, ConfigEncoding};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    EmptyTopology(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::EmptyTopology(path) => write!(f, "Empty topology: {}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the agent configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AgentConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Read a topology file into a configuration update.
///
/// Key-value topologies are TOML tables of string arrays. Documents are
/// passed through as `contents` and parsed during reconciliation.
pub fn load_topology(path: &Path, encoding: ConfigEncoding) -> Result<KvPairs, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    if content.trim().is_empty() {
        return Err(ConfigError::EmptyTopology(path.to_path_buf()));
    }

    match encoding {
        ConfigEncoding::KeyValues => toml::from_str(&content).map_err(ConfigError::Parse),
        ConfigEncoding::Document => Ok(KvPairs::from_document(content)),
    }
}
