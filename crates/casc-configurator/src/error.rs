//! Error types for binding and export
//!
//! Every document-related variant carries the type id being bound and the
//! [`NodePath`] of the offending node, so an operator can find the line to fix.

use casc_model::{ModelError, NodePath};
use casc_secrets::SecretError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure raised by [`ApiResource::into_model`](crate::ApiResource::into_model)
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ModelConstructionError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ModelConstructionError {
    /// Create error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create error wrapping an underlying cause
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Human readable reason
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from the registry and the type-specific configurators
#[derive(Debug, thiserror::Error)]
pub enum ConfiguratorError {
    /// No registration accepts the type
    #[error("no configurator registered for type '{type_id}'")]
    UnsupportedType {
        /// Requested type id
        type_id: String,
    },

    /// More than one registration accepts the type
    #[error("{count} configurators accept type '{type_id}'; exactly one is allowed")]
    AmbiguousConverter {
        /// Contested type id
        type_id: String,
        /// Number of accepting registrations
        count: usize,
    },

    /// The type claims to be exportable but exposes no resource schema
    #[error("type '{type_id}' at {path} is exportable but declares no resource schema")]
    SchemaDiscovery {
        /// Type being bound
        type_id: String,
        /// Node being bound
        path: NodePath,
    },

    /// The resolved document does not fit the resource schema
    #[error("cannot bind {path} to schema {schema} of type '{type_id}': {source}")]
    SchemaBinding {
        /// Type being bound
        type_id: String,
        /// Schema type name
        schema: &'static str,
        /// Node being bound
        path: NodePath,
        /// Deserializer error
        #[source]
        source: serde_yaml::Error,
    },

    /// The schema object could not be turned into the domain type
    #[error("constructing '{type_id}' from {path} failed: {source}")]
    ModelConstruction {
        /// Type being bound
        type_id: String,
        /// Node being bound
        path: NodePath,
        /// Constructor error
        #[source]
        source: ModelConstructionError,
    },

    /// A secret reference in a scalar could not be resolved
    #[error("secret resolution failed at {path}: {source}")]
    Secret {
        /// Scalar holding the reference
        path: NodePath,
        /// Resolver error
        #[source]
        source: SecretError,
    },

    /// Document parse or render failure
    #[error("document error: {0}")]
    Model(#[from] ModelError),

    /// Serializing a live instance failed
    #[error("export of '{type_id}' failed: {source}")]
    Export {
        /// Type being exported
        type_id: String,
        /// Underlying error
        #[source]
        source: BoxError,
    },

    /// Registry invariant broken (erased value of the wrong type)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConfiguratorError {
    /// Create export error
    pub fn export(
        type_id: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            type_id: type_id.into(),
            source: Box::new(source),
        }
    }

    /// Document location the error refers to, if any
    #[must_use]
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::SchemaDiscovery { path, .. }
            | Self::SchemaBinding { path, .. }
            | Self::ModelConstruction { path, .. }
            | Self::Secret { path, .. } => Some(path),
            Self::Model(e) => e.path(),
            Self::UnsupportedType { .. }
            | Self::AmbiguousConverter { .. }
            | Self::Export { .. }
            | Self::Internal(_) => None,
        }
    }

    /// Whether the fix belongs in code or registration rather than in the
    /// document
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType { .. }
                | Self::AmbiguousConverter { .. }
                | Self::SchemaDiscovery { .. }
                | Self::Internal(_)
        )
    }
}

/// Result type alias for configurator operations
pub type ConfiguratorResult<T> = Result<T, ConfiguratorError>;
