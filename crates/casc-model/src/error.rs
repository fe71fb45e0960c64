//! Error types for the document model

use crate::path::NodePath;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors while parsing or rendering documents
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Malformed text, or a structure the model cannot represent
    #[error("syntax error at {path}: {message}")]
    Syntax {
        /// Location of the offending node (root when the parser gives none)
        path: NodePath,
        /// Human readable reason
        message: String,
        /// Underlying parser error
        #[source]
        source: Option<BoxError>,
    },

    /// Serializer failure while rendering a tree
    #[error("render failed: {source}")]
    Render {
        /// Underlying serializer error
        #[source]
        source: BoxError,
    },
}

impl ModelError {
    /// Structural error at a known path
    pub fn syntax(path: NodePath, message: impl Into<String>) -> Self {
        Self::Syntax {
            path,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a parser error
    pub fn parser(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Syntax {
            path: NodePath::root(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a serializer error
    pub fn render(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Render {
            source: Box::new(source),
        }
    }

    /// Location of the failure, if it has one
    #[must_use]
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::Syntax { path, .. } => Some(path),
            Self::Render { .. } => None,
        }
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
