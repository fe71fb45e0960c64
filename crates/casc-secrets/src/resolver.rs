//! Secret reference resolution
//!
//! Reference syntax inside any scalar string:
//!
//! ```text
//! ${key}                 reveal `key` through the sources
//! ${key:-fallback}       ... or use `fallback` when no source has it
//! ${secret:key}          explicit form of the above
//! ${base64:text}         apply a lookup (see `Lookup`)
//! ${readFile:${PATH}}    references nest, innermost first
//! ^${key}                escaped: the literal text `${key}`
//! jdbc://${HOST}:5432    references interpolate into surrounding text
//! ```

use crate::config::SecretSourceConfig;
use crate::error::{SecretError, SecretResult, SourceError};
use crate::lookup::Lookup;
use crate::source::SecretSource;
use std::fmt;
use std::sync::Arc;

const OPEN: &str = "${";
const ESCAPE: char = '^';

/// Resolves secret references through an ordered chain of sources
///
/// The chain is fixed at construction and shared read-only afterwards; the
/// resolver is `Send + Sync` and can serve concurrent binds. Reveals are never
/// cached and never retried, and the resolver applies no timeout of its own.
#[derive(Clone, Default)]
pub struct SecretResolver {
    sources: Vec<Arc<dyn SecretSource>>,
}

impl fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}

impl SecretResolver {
    /// Resolver with no sources: only defaults and lookups resolve
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Resolver over an explicit, ordered source list
    #[inline]
    #[must_use]
    pub fn from_sources(sources: Vec<Arc<dyn SecretSource>>) -> Self {
        Self { sources }
    }

    /// Build sources from configuration, in declaration order
    ///
    /// # Errors
    /// Returns `SourceError` if a file-backed source cannot be loaded
    pub fn from_configs(configs: &[SecretSourceConfig]) -> Result<Self, SourceError> {
        configs
            .iter()
            .map(SecretSourceConfig::build)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_sources)
    }

    /// Append a source (lowest priority so far)
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl SecretSource) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Append an already shared source
    #[inline]
    #[must_use]
    pub fn with_shared_source(mut self, source: Arc<dyn SecretSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Source names in priority order
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Number of sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the chain is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Check whether `text` holds at least one unescaped reference
    #[must_use]
    pub fn contains_reference(text: &str) -> bool {
        text.match_indices(OPEN)
            .any(|(pos, _)| !text[..pos].ends_with(ESCAPE))
    }

    /// Escape every `${` in literal text so that resolving it yields `text`
    /// unchanged
    #[must_use]
    pub fn escape(text: &str) -> String {
        text.replace(OPEN, &format!("{ESCAPE}{OPEN}"))
    }

    /// Resolve every reference in `scalar`
    ///
    /// Text without `${` is returned unchanged and no source is consulted.
    ///
    /// # Errors
    /// - `SecretError::Unresolved` if no source reveals a key and it has no default
    /// - `SecretError::Source` if a source fails; later sources and the default
    ///   are not consulted
    /// - `SecretError::Malformed` on an unterminated reference or empty key
    /// - `SecretError::Lookup` if a lookup rejects its argument
    pub fn resolve(&self, scalar: &str) -> SecretResult<String> {
        if !scalar.contains(OPEN) {
            return Ok(scalar.to_string());
        }

        let mut out = String::with_capacity(scalar.len());
        let mut rest = scalar;
        while let Some(pos) = rest.find(OPEN) {
            let before = &rest[..pos];
            let after_open = &rest[pos + OPEN.len()..];

            if let Some(literal) = before.strip_suffix(ESCAPE) {
                out.push_str(literal);
                out.push_str(OPEN);
                rest = after_open;
                continue;
            }

            out.push_str(before);
            let close = closing_brace(after_open)
                .ok_or_else(|| SecretError::malformed(scalar, "unterminated reference"))?;
            let reference = &rest[pos..pos + OPEN.len() + close + 1];
            out.push_str(&self.resolve_expression(&after_open[..close], reference, scalar)?);
            rest = &after_open[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Ask each source in order; the first that reveals wins
    ///
    /// # Errors
    /// Returns `SecretError::Source` as soon as a source fails
    pub fn reveal(&self, key: &str, reference: &str) -> SecretResult<Option<String>> {
        for source in &self.sources {
            match source.reveal(key) {
                Ok(Some(value)) => {
                    tracing::trace!(source = source.name(), key, "secret revealed");
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(source = source.name(), key, error = %e, "secret source failed");
                    return Err(SecretError::Source {
                        source_name: source.name().to_string(),
                        reference: reference.to_string(),
                        source: e,
                    });
                }
            }
        }
        Ok(None)
    }

    fn resolve_expression(&self, body: &str, reference: &str, scalar: &str) -> SecretResult<String> {
        let (key_part, default) = split_default(body);
        let key = self.resolve(key_part)?;

        let revealed = if key.is_empty() {
            if default.is_none() {
                return Err(SecretError::malformed(scalar, "empty reference key"));
            }
            None
        } else {
            let lookup = key
                .split_once(':')
                .and_then(|(name, argument)| Lookup::from_name(name).map(|l| (l, argument)));
            match lookup {
                Some((Lookup::Secret, argument)) => self.reveal(argument, reference)?,
                Some((lookup, argument)) => Some(lookup.apply(argument, reference)?),
                None => self.reveal(&key, reference)?,
            }
        };

        match (revealed, default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => {
                tracing::trace!(reference, "secret default used");
                self.resolve(default)
            }
            (None, None) => Err(SecretError::Unresolved {
                reference: reference.to_string(),
            }),
        }
    }
}

/// Byte offset of the `}` closing the reference body, skipping nested ones
fn closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split `key:-default` at the first top-level `:-`
fn split_default(body: &str) -> (&str, Option<&str>) {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b'-') => {
                return (&body[..i], Some(&body[i + 2..]));
            }
            _ => {}
        }
        i += 1;
    }
    (body, None)
}
