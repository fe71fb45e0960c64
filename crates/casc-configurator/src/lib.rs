//! CASC Configurator
//!
//! Binds untyped configuration documents to strongly typed domain objects
//! and exports live objects back into documents for diffing.
//!
//! # Core Concepts
//!
//! - [`Configurable`]: a bindable domain type with a stable `TYPE_ID`
//! - [`ApiResource`] / [`HasResourceSchema`]: the serde schema object that
//!   builds and describes the domain type
//! - [`ResourceConfigurator`]: the schema-driven converter for one type
//! - [`ConfiguratorRegistry`]: dispatches by [`TypeToken`] to exactly one
//!   converter
//! - [`ConfigurationContext`]: secret resolver, export policy and root path
//!
//! # Binding
//!
//! Every scalar is routed through the secret resolver, the resolved tree is
//! rendered to YAML, and the text is deserialized into the schema object,
//! which then builds the domain value. Binding is all-or-nothing.
//!
//! # Export
//!
//! Secrets bound from a reference export as that reference, so an exported
//! document never contains revealed secret material unless the context asks
//! for [`ExportPolicy::Plaintext`]. Every other scalar has `${` escaped as
//! `^${`, so binding an exported document reads literals back as literals.
//!
//! # Example
//!
//! ```rust
//! use casc_configurator::{
//!     ApiResource, Configurable, ConfigurationContext, ConfiguratorRegistry, HasResourceSchema,
//!     ModelConstructionError, ResourceSchema,
//! };
//! use casc_secrets::{MapSecretSource, Secret, SecretResolver};
//! use serde::{Deserialize, Serialize};
//!
//! struct Login { user: String, password: Secret }
//!
//! #[derive(Serialize, Deserialize)]
//! struct LoginResource { user: String, password: Secret }
//!
//! impl ApiResource for LoginResource {
//!     type Model = Login;
//!     fn into_model(self) -> Result<Login, ModelConstructionError> {
//!         Ok(Login { user: self.user, password: self.password })
//!     }
//! }
//!
//! impl Configurable for Login {
//!     const TYPE_ID: &'static str = "login";
//!     const EXPORTABLE: bool = true;
//!     fn resource_schema() -> Option<ResourceSchema<Self>> {
//!         Some(ResourceSchema::of())
//!     }
//! }
//!
//! impl HasResourceSchema for Login {
//!     type Resource = LoginResource;
//!     fn resource(&self) -> Option<LoginResource> {
//!         Some(LoginResource { user: self.user.clone(), password: self.password.clone() })
//!     }
//! }
//!
//! let registry = ConfiguratorRegistry::builder().resource::<Login>().build().unwrap();
//! let ctx = ConfigurationContext::new(
//!     SecretResolver::new().with_source(MapSecretSource::new("inline").with("db_pw", "hunter2")),
//! );
//!
//! let doc = casc_model::parse("user: admin\npassword: \"${SECRET:db_pw}\"\n").unwrap();
//! let login: Login = registry.bind(&doc, &ctx).unwrap();
//! assert_eq!(login.password.expose(), "hunter2");
//!
//! let exported = registry.describe(&login, &ctx).unwrap().unwrap();
//! assert_eq!(exported, doc);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod configurator;
pub mod context;
pub mod error;
pub mod registry;
pub mod resource;
pub mod token;

// Re-exports
pub use casc_secrets::ExportPolicy;
pub use config::{BinderConfig, ConfigError};
pub use configurator::{Configurator, ResourceConfigurator};
pub use context::ConfigurationContext;
pub use error::{ConfiguratorError, ConfiguratorResult, ModelConstructionError};
pub use registry::{default_capability, CapabilityPredicate, ConfiguratorRegistry, RegistryBuilder};
pub use resource::{ApiResource, Configurable, DecodeError, HasResourceSchema, ResourceSchema};
pub use token::TypeToken;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
