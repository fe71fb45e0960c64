//! Secret-bearing string values
//!
//! [`Secret`] is the field type schema objects use for passwords, tokens and
//! keys. It never prints its value through `Debug` or `Display`, and it
//! remembers the reference expression it was resolved from so that export can
//! hand back `${SECRET:db_pw}` instead of the revealed text.
//!
//! Origins flow in through [`SecretOrigins::scope`] during deserialization.
//! A resolved value that only ever came from one reference is matched by
//! value. When the same text also appears as a literal, or comes from two
//! different references, a [`SecretTrace`] pass over a marked copy of the
//! document records which `Secret` field read which scalar, and the real pass
//! replays that record in order.
//!
//! The export form is picked by [`ExportPolicy::scope`] during serialization.
//! All of this state is thread-scoped and restored by a drop guard when the
//! closure returns, so concurrent binds on other threads never see each
//! other's state.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const REDACTED: &str = "****";

thread_local! {
    static ORIGINS: RefCell<Option<OriginScope>> = const { RefCell::new(None) };
    static EXPORT: Cell<ExportPolicy> = const { Cell::new(ExportPolicy::MaskSecrets) };
}

/// Distinguishes the markers of concurrent traces
static TRACE_IDS: AtomicU64 = AtomicU64::new(0);

/// Resolved value and the reference it came from
type Origin = (String, String);

enum OriginScope {
    Bind { origins: SecretOrigins, next: usize },
    Trace { markers: HashMap<String, Origin>, log: Vec<Option<Origin>> },
}

impl OriginScope {
    /// Origin for the next `Secret` deserialized with `value`
    fn next_origin(&mut self, value: &str) -> Option<String> {
        match self {
            Self::Bind { origins, next } => {
                let traced = origins.traced.get(*next).cloned().flatten();
                *next += 1;
                match traced {
                    Some((resolved, reference)) if resolved == value => Some(reference),
                    _ => origins.origin_of(value).map(str::to_string),
                }
            }
            Self::Trace { markers, log } => {
                log.push(markers.get(value).cloned());
                None
            }
        }
    }
}

fn install(scope: OriginScope) -> RestoreOrigins {
    RestoreOrigins(ORIGINS.with(|cell| cell.replace(Some(scope))))
}

struct RestoreOrigins(Option<OriginScope>);

impl Drop for RestoreOrigins {
    fn drop(&mut self) {
        let previous = self.0.take();
        ORIGINS.with(|cell| cell.replace(previous));
    }
}

/// How [`Secret`] fields serialize on export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPolicy {
    /// Emit the original reference when the secret came from one
    #[default]
    MaskSecrets,
    /// Emit the revealed value (local debugging only)
    Plaintext,
}

impl ExportPolicy {
    /// Run `f` with this policy governing `Secret` serialization on the
    /// current thread
    pub fn scope<R>(self, f: impl FnOnce() -> R) -> R {
        let previous = EXPORT.with(|cell| cell.replace(self));
        let _restore = RestoreExport(previous);
        f()
    }

    /// Policy in effect on the current thread
    #[must_use]
    pub fn current() -> Self {
        EXPORT.with(Cell::get)
    }
}

struct RestoreExport(ExportPolicy);

impl Drop for RestoreExport {
    fn drop(&mut self) {
        EXPORT.with(|cell| cell.set(self.0));
    }
}

/// Where the resolved values of one bind came from
#[derive(Clone, Default)]
pub struct SecretOrigins {
    by_value: HashMap<String, String>,
    traced: Vec<Option<Origin>>,
}

impl fmt::Debug for SecretOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretOrigins")
            .field("by_value", &self.by_value.len())
            .field("traced", &self.traced.len())
            .finish()
    }
}

impl SecretOrigins {
    /// Create empty collection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that every occurrence of `resolved` came from `reference`
    ///
    /// Only for values that are unambiguous within the bound document. The
    /// first reference recorded for a value is kept.
    pub fn record(&mut self, resolved: impl Into<String>, reference: impl Into<String>) {
        self.by_value
            .entry(resolved.into())
            .or_insert_with(|| reference.into());
    }

    /// Attach the per-field record of a successful [`SecretTrace`] pass
    ///
    /// It takes precedence over value matching, in `Secret` deserialization
    /// order.
    pub fn attach_trace(&mut self, log: TraceLog) {
        self.traced = log.0;
    }

    /// Reference an unambiguous resolved value came from
    #[must_use]
    pub fn origin_of(&self, resolved: &str) -> Option<&str> {
        self.by_value.get(resolved).map(String::as_str)
    }

    /// Number of distinct origins known
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_value.len() + self.traced.iter().flatten().count()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` with these origins visible to `Secret` deserialization on the
    /// current thread
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _restore = install(OriginScope::Bind {
            origins: self.clone(),
            next: 0,
        });
        f()
    }
}

/// Placeholders standing in for ambiguous resolved values during a tracing
/// deserialization pass
pub struct SecretTrace {
    id: u64,
    markers: HashMap<String, Origin>,
}

impl fmt::Debug for SecretTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretTrace")
            .field("markers", &self.markers.len())
            .finish()
    }
}

impl Default for SecretTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretTrace {
    /// Create empty trace
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: TRACE_IDS.fetch_add(1, Ordering::Relaxed),
            markers: HashMap::new(),
        }
    }

    /// Placeholder text for one scalar whose `resolved` value came from
    /// `reference`
    pub fn mark(&mut self, resolved: impl Into<String>, reference: impl Into<String>) -> String {
        let marker = format!("__secret_origin_{}_{}__", self.id, self.markers.len());
        self.markers
            .insert(marker.clone(), (resolved.into(), reference.into()));
        marker
    }

    /// Number of marked scalars
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Check if nothing was marked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Run `f`, logging for every `Secret` it deserializes which marker (if
    /// any) that field read
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> (R, TraceLog) {
        let restore = install(OriginScope::Trace {
            markers: self.markers.clone(),
            log: Vec::new(),
        });
        let result = f();
        let log = ORIGINS.with(|cell| match cell.borrow_mut().take() {
            Some(OriginScope::Trace { log, .. }) => log,
            _ => Vec::new(),
        });
        drop(restore);
        (result, TraceLog(log))
    }
}

/// Per-`Secret` record of a [`SecretTrace`] pass
#[derive(Default)]
pub struct TraceLog(Vec<Option<Origin>>);

impl fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLog")
            .field("secrets", &self.0.len())
            .field("traced", &self.0.iter().flatten().count())
            .finish()
    }
}

impl TraceLog {
    /// Number of `Secret` fields seen
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no `Secret` field was seen
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// String whose value is never printed
///
/// Equality compares the revealed value only.
#[derive(Clone, Default)]
pub struct Secret {
    value: String,
    origin: Option<String>,
}

impl Secret {
    /// Secret with a literal value and no origin
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }

    /// Secret that was resolved from `reference`
    #[inline]
    #[must_use]
    pub fn from_reference(value: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: Some(reference.into()),
        }
    }

    /// The revealed value
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Reference expression this value was resolved from
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Check if the revealed value is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("value", &REDACTED)
            .field("origin", &self.origin)
            .finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (ExportPolicy::current(), &self.origin) {
            (ExportPolicy::MaskSecrets, Some(origin)) => serializer.serialize_str(origin),
            _ => serializer.serialize_str(&self.value),
        }
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        let origin = ORIGINS.with(|cell| {
            cell.borrow_mut()
                .as_mut()
                .and_then(|scope| scope.next_origin(&value))
        });
        Ok(Self { value, origin })
    }
}
