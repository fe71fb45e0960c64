//! Secret sources
//!
//! A [`SecretSource`] answers one question: "do you hold a value for this
//! key?". `Ok(None)` means no, and the resolver moves on to the next source.
//! `Err(_)` means the source could not answer (I/O failure), and resolution
//! stops immediately.
//!
//! Built-in sources:
//! - [`MapSecretSource`]: in-memory values
//! - [`EnvSecretSource`]: process environment
//! - [`DirectorySecretSource`]: one file per key (Docker/Kubernetes mounts)
//! - [`PropertiesSecretSource`]: a `key=value` file

use crate::error::SourceError;
use indexmap::IndexMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Provider of secret values
///
/// Implementations must be cheap to call repeatedly: the resolver never
/// caches reveals, since secret material may rotate between binds.
pub trait SecretSource: Send + Sync + 'static {
    /// Stable name used in diagnostics
    fn name(&self) -> &str;

    /// Reveal the value for `key`
    ///
    /// # Errors
    /// Returns `SourceError` if the backing store could not be read. A key
    /// the source simply does not hold is `Ok(None)`.
    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError>;
}

/// In-memory secret source
#[derive(Debug, Clone, Default)]
pub struct MapSecretSource {
    name: String,
    values: IndexMap<String, String>,
}

impl MapSecretSource {
    /// Create empty source with a diagnostic name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    /// Builder-style insertion
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert a value
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Number of held values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SecretSource for MapSecretSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Process environment as a secret source
///
/// With a prefix, `${db_pw}` reads `<prefix>db_pw`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource {
    prefix: Option<String>,
}

impl EnvSecretSource {
    /// Read variables by their exact name
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Read variables named `<prefix><key>`
    #[inline]
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl SecretSource for EnvSecretSource {
    fn name(&self) -> &str {
        "env"
    }

    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError> {
        let name = match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        };
        if name.is_empty() || name.contains(['=', '\0']) {
            return Ok(None);
        }
        match std::env::var(&name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(SourceError::NotUnicode { name }),
        }
    }
}

/// Directory holding one file per secret
///
/// The file name is the key and its content (minus trailing newlines) is
/// the value. Keys that would escape the directory are never revealed.
#[derive(Debug, Clone)]
pub struct DirectorySecretSource {
    root: PathBuf,
}

impl DirectorySecretSource {
    /// Conventional Docker secrets mount
    pub const DOCKER_SECRETS: &'static str = "/run/secrets";

    /// Create source rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_plain_file_name(key: &str) -> bool {
        !key.is_empty() && key != "." && key != ".." && !key.contains(['/', '\\', '\0'])
    }
}

impl SecretSource for DirectorySecretSource {
    fn name(&self) -> &str {
        "directory"
    }

    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError> {
        if !Self::is_plain_file_name(key) {
            return Ok(None);
        }
        let path = self.root.join(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content.trim_end_matches(['\n', '\r']).to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::io_error(path, e)),
        }
    }
}

/// `key=value` file loaded once at construction
///
/// Blank lines and lines starting with `#` or `!` are ignored. The first `=`
/// or `:` separates key from value; both are trimmed.
#[derive(Debug, Clone)]
pub struct PropertiesSecretSource {
    path: PathBuf,
    values: IndexMap<String, String>,
}

impl PropertiesSecretSource {
    /// Load properties from `path`
    ///
    /// # Errors
    /// Returns `SourceError::Io` if the file cannot be read
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let content =
            std::fs::read_to_string(&path).map_err(|e| SourceError::io_error(&path, e))?;
        Ok(Self {
            values: Self::parse(&content),
            path,
        })
    }

    fn parse(content: &str) -> IndexMap<String, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(['#', '!']))
            .filter_map(|line| {
                let split = line.find(['=', ':'])?;
                let key = line[..split].trim();
                (!key.is_empty()).then(|| (key.to_string(), line[split + 1..].trim().to_string()))
            })
            .collect()
    }

    /// File the values were loaded from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of loaded values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SecretSource for PropertiesSecretSource {
    fn name(&self) -> &str {
        "properties"
    }

    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError> {
        Ok(self.values.get(key).cloned())
    }
}
