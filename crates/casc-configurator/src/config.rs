//! Binder configuration
//!
//! Loaded from TOML or YAML, picked by file extension:
//!
//! ```toml
//! export = "mask_secrets"
//!
//! [[secret_sources]]
//! kind = "directory"
//! path = "/run/secrets"
//!
//! [[secret_sources]]
//! kind = "env"
//! ```

use casc_secrets::{ExportPolicy, SecretResolver, SecretSourceConfig, SourceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Binder settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinderConfig {
    /// Provider chain, highest priority first
    pub secret_sources: Vec<SecretSourceConfig>,
    /// How secrets appear in exported documents
    pub export: ExportPolicy,
}

impl BinderConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::UnknownFormat` for any other extension
    /// - `ConfigError::Toml` / `ConfigError::Yaml` on malformed content
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("yaml" | "yml") => Self::from_yaml_str,
            _ => {
                return Err(ConfigError::UnknownFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            sources = config.secret_sources.len(),
            "loaded binder config"
        );
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `ConfigError::Toml` on malformed content
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// `ConfigError::Yaml` on malformed content
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Build the configured provider chain
    ///
    /// # Errors
    /// `ConfigError::Source` if a file-backed source cannot be loaded
    pub fn resolver(&self) -> Result<SecretResolver, ConfigError> {
        Ok(SecretResolver::from_configs(&self.secret_sources)?)
    }
}

/// Errors while loading binder configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Extension is neither TOML nor YAML
    #[error("unknown config format for {path}; expected .toml, .yaml or .yml")]
    UnknownFormat {
        /// Offending file
        path: PathBuf,
    },

    /// Invalid TOML
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid YAML
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configured secret source could not be built
    #[error("secret source: {0}")]
    Source(#[from] SourceError),
}
