//! Declarative secret source configuration

use crate::error::SourceError;
use crate::source::{
    DirectorySecretSource, EnvSecretSource, MapSecretSource, PropertiesSecretSource, SecretSource,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// One entry of the provider chain, tagged by `kind`
///
/// ```toml
/// [[secret_sources]]
/// kind = "env"
/// prefix = "CASC_"
///
/// [[secret_sources]]
/// kind = "directory"
/// path = "/run/secrets"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretSourceConfig {
    /// Process environment
    Env {
        /// Optional variable name prefix
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
    /// One file per secret
    Directory {
        /// Directory holding the files
        path: PathBuf,
    },
    /// `key=value` file
    Properties {
        /// Properties file
        path: PathBuf,
    },
    /// Values written in the configuration itself
    Inline {
        /// Key to value
        #[serde(default)]
        values: IndexMap<String, String>,
    },
}

impl SecretSourceConfig {
    /// Build the configured source
    ///
    /// # Errors
    /// Returns `SourceError` if a properties file cannot be read
    pub fn build(&self) -> Result<Arc<dyn SecretSource>, SourceError> {
        Ok(match self {
            Self::Env { prefix: None } => Arc::new(EnvSecretSource::new()),
            Self::Env {
                prefix: Some(prefix),
            } => Arc::new(EnvSecretSource::with_prefix(prefix.clone())),
            Self::Directory { path } => Arc::new(DirectorySecretSource::new(path.clone())),
            Self::Properties { path } => Arc::new(PropertiesSecretSource::load(path.clone())?),
            Self::Inline { values } => Arc::new(
                values
                    .iter()
                    .fold(MapSecretSource::new("inline"), |source, (k, v)| source.with(k, v)),
            ),
        })
    }
}
