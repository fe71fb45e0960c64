//! CASC Secret Resolution
//!
//! Rewrites secret references embedded in configuration scalars before they
//! reach a typed binder.
//!
//! # Core Concepts
//!
//! - [`SecretResolver`]: resolves `${[lookup:]key[:-default]}` references
//!   through an ordered provider chain
//! - [`SecretSource`]: one provider (environment, secret mount, file, memory)
//! - [`Lookup`]: named transforms such as `base64:` and `readFile:`
//! - [`Secret`]: redacted string that remembers its reference for export
//! - [`SecretOrigins`] / [`SecretTrace`]: which reference each bound
//!   `Secret` came from
//!
//! # Resolution order
//!
//! 1. The first source that reveals the key wins
//! 2. Otherwise the declared default is used
//! 3. Otherwise resolution fails with [`SecretError::Unresolved`]
//!
//! A source that fails (I/O) stops resolution at once; the default is not
//! consulted.
//!
//! # Example
//!
//! ```rust
//! use casc_secrets::{MapSecretSource, SecretResolver};
//!
//! let resolver = SecretResolver::new()
//!     .with_source(MapSecretSource::new("inline").with("db_pw", "hunter2"));
//!
//! assert_eq!(resolver.resolve("${SECRET:db_pw}").unwrap(), "hunter2");
//! assert_eq!(resolver.resolve("${missing:-none}").unwrap(), "none");
//! assert_eq!(resolver.resolve("^${db_pw}").unwrap(), "${db_pw}");
//! assert_eq!(SecretResolver::escape("${db_pw}"), "^${db_pw}");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod lookup;
pub mod resolver;
pub mod secret;
pub mod source;

// Re-exports
pub use config::SecretSourceConfig;
pub use error::{SecretError, SecretResult, SourceError};
pub use lookup::Lookup;
pub use resolver::SecretResolver;
pub use secret::{ExportPolicy, Secret, SecretOrigins, SecretTrace, TraceLog};
pub use source::{
    DirectorySecretSource, EnvSecretSource, MapSecretSource, PropertiesSecretSource, SecretSource,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
