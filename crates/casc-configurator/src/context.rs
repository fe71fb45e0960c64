//! Per-bind configuration context

use crate::config::{BinderConfig, ConfigError};
use casc_model::NodePath;
use casc_secrets::{ExportPolicy, SecretResolver};

/// Everything a configurator needs besides the node itself
///
/// Shared by reference; `Send + Sync`, so one context can serve concurrent
/// binds.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationContext {
    resolver: SecretResolver,
    export: ExportPolicy,
    root: NodePath,
}

impl ConfigurationContext {
    /// Context with the given resolver, masked export and a root path
    #[inline]
    #[must_use]
    pub fn new(resolver: SecretResolver) -> Self {
        Self {
            resolver,
            export: ExportPolicy::default(),
            root: NodePath::root(),
        }
    }

    /// Context built from binder configuration
    ///
    /// # Errors
    /// `ConfigError::Source` if a configured secret source cannot be loaded
    pub fn from_config(config: &BinderConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.resolver()?).with_export_policy(config.export))
    }

    /// Set export policy
    #[inline]
    #[must_use]
    pub fn with_export_policy(mut self, export: ExportPolicy) -> Self {
        self.export = export;
        self
    }

    /// Set the location of bound nodes inside the full document
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: NodePath) -> Self {
        self.root = root;
        self
    }

    /// Secret resolver
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &SecretResolver {
        &self.resolver
    }

    /// Export policy
    #[inline]
    #[must_use]
    pub fn export_policy(&self) -> ExportPolicy {
        self.export
    }

    /// Prefix for every path reported in errors
    #[inline]
    #[must_use]
    pub fn root(&self) -> &NodePath {
        &self.root
    }
}
