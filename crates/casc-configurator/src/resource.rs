//! Resource capability traits
//!
//! A domain type opts into configuration-as-code in three steps:
//!
//! 1. [`Configurable`]: a stable `TYPE_ID` and the `EXPORTABLE` flag
//! 2. [`ApiResource`]: a serde schema object that builds the domain type
//! 3. [`HasResourceSchema`]: ties the two together, and
//!    [`Configurable::resource_schema`] returns `Some(ResourceSchema::of())`
//!
//! # Example
//! ```rust
//! use casc_configurator::{
//!     ApiResource, Configurable, HasResourceSchema, ModelConstructionError, ResourceSchema,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! struct Proxy { host: String, port: u16 }
//!
//! #[derive(Serialize, Deserialize)]
//! struct ProxyResource { host: String, port: u16 }
//!
//! impl ApiResource for ProxyResource {
//!     type Model = Proxy;
//!
//!     fn into_model(self) -> Result<Proxy, ModelConstructionError> {
//!         Ok(Proxy { host: self.host, port: self.port })
//!     }
//! }
//!
//! impl Configurable for Proxy {
//!     const TYPE_ID: &'static str = "proxy";
//!     const EXPORTABLE: bool = true;
//!
//!     fn resource_schema() -> Option<ResourceSchema<Self>> {
//!         Some(ResourceSchema::of())
//!     }
//! }
//!
//! impl HasResourceSchema for Proxy {
//!     type Resource = ProxyResource;
//!
//!     fn resource(&self) -> Option<ProxyResource> {
//!         Some(ProxyResource { host: self.host.clone(), port: self.port })
//!     }
//! }
//! ```

use crate::error::ModelConstructionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// A type the registry can bind
pub trait Configurable: Send + Sync + Sized + 'static {
    /// Stable identifier used for lookup by name and in diagnostics
    const TYPE_ID: &'static str;

    /// Whether the type takes part in export
    ///
    /// The default capability predicate only accepts exportable types.
    const EXPORTABLE: bool = false;

    /// Schema accessor
    ///
    /// An exportable type that returns `None` here fails to bind with
    /// `SchemaDiscovery`.
    fn resource_schema() -> Option<ResourceSchema<Self>> {
        None
    }
}

/// Serde schema object for a domain type
pub trait ApiResource: Serialize + DeserializeOwned + 'static {
    /// Domain type this resource builds
    type Model;

    /// Build the domain value
    ///
    /// # Errors
    /// Returns `ModelConstructionError` when the values are well-typed but
    /// violate the domain type's own rules
    fn into_model(self) -> Result<Self::Model, ModelConstructionError>;
}

/// Link between a domain type and its schema object
pub trait HasResourceSchema: Configurable {
    /// Schema object
    type Resource: ApiResource<Model = Self>;

    /// Project the live value back to its schema object
    ///
    /// `None` declines export for this instance (write-only values).
    fn resource(&self) -> Option<Self::Resource>;
}

/// Why decoding through a [`ResourceSchema`] failed
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Text did not fit the schema object
    #[error("schema binding failed: {0}")]
    Binding(#[source] serde_yaml::Error),

    /// Schema object rejected by `into_model`
    #[error("model construction failed: {0}")]
    Construction(#[source] ModelConstructionError),
}

type DecodeFn<T> = fn(&str) -> Result<T, DecodeError>;
type ValidateFn = fn(&str) -> Result<(), serde_yaml::Error>;
type EncodeFn<T> = fn(&T) -> Option<Result<String, serde_yaml::Error>>;

/// Typed handle on a domain type's schema object
pub struct ResourceSchema<T> {
    name: &'static str,
    decode: DecodeFn<T>,
    validate: ValidateFn,
    encode: EncodeFn<T>,
}

impl<T> ResourceSchema<T> {
    /// Handle for `T`'s declared `Resource`
    #[must_use]
    pub fn of() -> Self
    where
        T: HasResourceSchema,
    {
        Self {
            name: std::any::type_name::<T::Resource>(),
            decode: decode_via_resource::<T>,
            validate: validate_resource::<T>,
            encode: encode_via_resource::<T>,
        }
    }

    /// Schema type name for diagnostics
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// YAML text → schema object → `T`
    ///
    /// # Errors
    /// `DecodeError::Binding` if the text does not fit the schema,
    /// `DecodeError::Construction` if `into_model` rejects it
    pub fn decode(&self, text: &str) -> Result<T, DecodeError> {
        (self.decode)(text)
    }

    /// YAML text → schema object, without building `T`
    ///
    /// # Errors
    /// Returns the deserializer error
    pub fn validate(&self, text: &str) -> Result<(), serde_yaml::Error> {
        (self.validate)(text)
    }

    /// `T` → schema object → YAML text, `None` if the value declines export
    ///
    /// # Errors
    /// Returns the serializer error
    pub fn encode(&self, value: &T) -> Option<Result<String, serde_yaml::Error>> {
        (self.encode)(value)
    }
}

impl<T> Clone for ResourceSchema<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceSchema<T> {}

impl<T> fmt::Debug for ResourceSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSchema").field("name", &self.name).finish()
    }
}

fn decode_via_resource<T: HasResourceSchema>(text: &str) -> Result<T, DecodeError> {
    let resource: T::Resource = serde_yaml::from_str(text).map_err(DecodeError::Binding)?;
    resource.into_model().map_err(DecodeError::Construction)
}

fn validate_resource<T: HasResourceSchema>(text: &str) -> Result<(), serde_yaml::Error> {
    serde_yaml::from_str::<T::Resource>(text).map(drop)
}

fn encode_via_resource<T: HasResourceSchema>(
    value: &T,
) -> Option<Result<String, serde_yaml::Error>> {
    value.resource().map(|resource| serde_yaml::to_string(&resource))
}
