//! CASC Document Model
//!
//! The in-memory form of a configuration document, shared by the YAML/JSON
//! front ends and the typed binder.
//!
//! # Core Concepts
//!
//! - [`Node`]: mapping, sequence or scalar
//! - [`Scalar`]: text plus a [`ScalarFormat`] tag (string, number, boolean)
//! - [`NodePath`]: location of a node, used in every diagnostic
//! - [`parse`] / [`render`]: YAML text ↔ [`Node`]
//!
//! # Round-trip law
//!
//! `parse(&render(&n)?)? == n` for any node whose number scalars are in
//! canonical form (as produced by [`parse`] or [`Scalar::number`]).
//!
//! # Example
//!
//! ```rust
//! use casc_model::{parse, render, Node};
//!
//! let doc = parse("credentials:\n  - username: some-user\n").unwrap();
//! let user = doc.at(&"credentials[0].username".parse().unwrap());
//! assert_eq!(user, Some(&Node::from("some-user")));
//! assert_eq!(parse(&render(&doc).unwrap()).unwrap(), doc);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod format;
pub mod node;
pub mod path;

// Re-exports
pub use error::{ModelError, ModelResult};
pub use format::{parse, parse_json, render, render_json, Format};
pub use node::{Mapping, Node, Scalar, ScalarFormat};
pub use path::{NodePath, PathError, PathSegment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
