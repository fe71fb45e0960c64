//! Error types for secret resolution
//!
//! Two layers:
//! - [`SourceError`]: a single provider failed (I/O, bad encoding)
//! - [`SecretError`]: resolving a scalar failed, wrapping the provider error
//!   together with the reference that triggered it

use std::path::PathBuf;

/// Failure inside one secret source
///
/// Distinct from "this source has no such secret", which is `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// IO error while reading backing storage
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Environment variable exists but is not UTF-8
    #[error("environment variable {name} is not valid unicode")]
    NotUnicode {
        /// Variable name
        name: String,
    },

    /// Backend-specific failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl SourceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while resolving secret references in a scalar
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// No source revealed the key and no default was declared
    #[error("secret reference {reference} was not revealed by any source and declares no default")]
    Unresolved {
        /// The reference expression, e.g. `${SECRET:db_pw}`
        reference: String,
    },

    /// A source failed while revealing; resolution stopped there
    #[error("secret source '{source_name}' failed while revealing {reference}: {source}")]
    Source {
        /// Name of the failing source
        source_name: String,
        /// The reference expression being resolved
        reference: String,
        /// Underlying failure
        #[source]
        source: SourceError,
    },

    /// Reference syntax error (unterminated `${`, empty key)
    #[error("malformed secret reference in '{scalar}': {reason}")]
    Malformed {
        /// The scalar text containing the reference
        scalar: String,
        /// What is wrong with it
        reason: String,
    },

    /// A lookup rejected its argument
    #[error("lookup '{lookup}' failed: {reason}")]
    Lookup {
        /// Lookup name
        lookup: &'static str,
        /// What went wrong
        reason: String,
    },
}

impl SecretError {
    /// Create malformed-reference error
    pub fn malformed(scalar: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            scalar: scalar.into(),
            reason: reason.into(),
        }
    }

    /// The reference expression involved, when known
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Unresolved { reference } | Self::Source { reference, .. } => Some(reference),
            Self::Malformed { .. } | Self::Lookup { .. } => None,
        }
    }

    /// Whether the failure came from provider I/O rather than the document
    #[inline]
    #[must_use]
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::Source { .. })
    }
}

/// Result type alias for secret operations
pub type SecretResult<T> = Result<T, SecretError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_display_names_reference() {
        let err = SecretError::Unresolved {
            reference: "${db_pw}".to_string(),
        };
        assert!(err.to_string().contains("${db_pw}"));
        assert_eq!(err.reference(), Some("${db_pw}"));
        assert!(!err.is_source_failure());
    }

    #[test]
    fn source_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SecretError::Source {
            source_name: "directory".to_string(),
            reference: "${db_pw}".to_string(),
            source: SourceError::io_error("/run/secrets/db_pw", io),
        };
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("directory"));
        let inner = std::error::Error::source(&err).unwrap();
        assert!(inner.to_string().contains("/run/secrets/db_pw"));
    }

    #[test]
    fn malformed_display() {
        let err = SecretError::malformed("${oops", "unterminated reference");
        assert_eq!(
            err.to_string(),
            "malformed secret reference in '${oops': unterminated reference"
        );
    }
}
