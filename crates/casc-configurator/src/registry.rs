//! Configurator registry and dispatcher
//!
//! Holds one registration per configurator, each with a capability
//! predicate. For any [`TypeToken`] at most one predicate may accept it;
//! [`RegistryBuilder::build`] rejects a registry where that does not hold.
//! Once built the registry is immutable and can be shared across threads
//! without locks.

use crate::configurator::{Configurator, ResourceConfigurator};
use crate::context::ConfigurationContext;
use crate::error::{ConfiguratorError, ConfiguratorResult};
use crate::resource::Configurable;
use crate::token::TypeToken;
use casc_model::{Node, NodePath};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Decides whether a configurator accepts a requested type
pub type CapabilityPredicate = Arc<dyn Fn(&TypeToken, &dyn Configurator) -> bool + Send + Sync>;

/// Default predicate: the token is the configurator's target and the target
/// is exportable
#[must_use]
pub fn default_capability(token: &TypeToken, configurator: &dyn Configurator) -> bool {
    *token == configurator.target() && configurator.exportable()
}

struct Registration {
    configurator: Arc<dyn Configurator>,
    predicate: Option<CapabilityPredicate>,
}

impl Registration {
    fn accepts(&self, token: &TypeToken) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(token, self.configurator.as_ref()),
            None => default_capability(token, self.configurator.as_ref()),
        }
    }
}

/// Builder for [`ConfiguratorRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with the default capability predicate
    #[must_use]
    pub fn register<C: Configurator>(mut self, configurator: C) -> Self {
        self.registrations.push(Registration {
            configurator: Arc::new(configurator),
            predicate: None,
        });
        self
    }

    /// Register with a custom capability predicate
    #[must_use]
    pub fn register_with<C, P>(mut self, configurator: C, predicate: P) -> Self
    where
        C: Configurator,
        P: Fn(&TypeToken, &dyn Configurator) -> bool + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            configurator: Arc::new(configurator),
            predicate: Some(Arc::new(predicate)),
        });
        self
    }

    /// Register the schema-driven configurator for `T`
    #[must_use]
    pub fn resource<T: Configurable>(self) -> Self {
        self.register(ResourceConfigurator::<T>::new())
    }

    /// Validate exclusivity and freeze the registry
    ///
    /// # Errors
    /// `ConfiguratorError::AmbiguousConverter` if two registrations accept the
    /// same token, or two distinct types share a `TYPE_ID`
    pub fn build(self) -> ConfiguratorResult<ConfiguratorRegistry> {
        let mut by_name: HashMap<&'static str, TypeToken> = HashMap::new();
        for registration in &self.registrations {
            let token = registration.configurator.target();
            match by_name.get(token.name()) {
                Some(existing) if *existing != token => {
                    return Err(ConfiguratorError::AmbiguousConverter {
                        type_id: token.name().to_string(),
                        count: 2,
                    });
                }
                Some(_) => {}
                None => {
                    by_name.insert(token.name(), token);
                }
            }
        }

        let registry = ConfiguratorRegistry {
            registrations: self.registrations,
            by_name,
        };
        // A registered type nobody accepts is fine here; it fails at dispatch
        for token in registry.by_name.values() {
            if let Err(e @ ConfiguratorError::AmbiguousConverter { .. }) = registry.select(token) {
                return Err(e);
            }
        }

        tracing::debug!(
            registrations = registry.registrations.len(),
            types = registry.by_name.len(),
            "configurator registry built"
        );
        Ok(registry)
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// Immutable dispatcher from type tokens to configurators
pub struct ConfiguratorRegistry {
    registrations: Vec<Registration>,
    by_name: HashMap<&'static str, TypeToken>,
}

impl fmt::Debug for ConfiguratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort_unstable();
        f.debug_struct("ConfiguratorRegistry")
            .field("registrations", &self.registrations.len())
            .field("types", &names)
            .finish()
    }
}

impl ConfiguratorRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Bind `node` into a `T`
    ///
    /// # Errors
    /// - `UnsupportedType` / `AmbiguousConverter` from dispatch
    /// - any error of the selected configurator
    /// - `Internal` if the configurator produced another type
    pub fn bind<T: Configurable>(&self, node: &Node, ctx: &ConfigurationContext) -> ConfiguratorResult<T> {
        let token = TypeToken::of::<T>();
        self.bind_token(&token, node, ctx)?
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| {
                ConfiguratorError::Internal(format!(
                    "configurator for '{}' produced a value of another type",
                    token.name()
                ))
            })
    }

    /// Bind `node` into the type identified by `token`, type-erased
    ///
    /// # Errors
    /// Same as [`ConfiguratorRegistry::bind`], minus the downcast
    pub fn bind_token(
        &self,
        token: &TypeToken,
        node: &Node,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Box<dyn Any + Send>> {
        let configurator = self.select(token)?;
        configurator.bind(node, &NodePath::root(), ctx).map_err(|e| {
            tracing::debug!(type_id = token.name(), error = %e, "bind failed");
            e
        })
    }

    /// Bind `node` into the type whose `TYPE_ID` is `type_id`
    ///
    /// # Errors
    /// `UnsupportedType` if no registered type has that id, otherwise as
    /// [`ConfiguratorRegistry::bind_token`]
    pub fn bind_named(
        &self,
        type_id: &str,
        node: &Node,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Box<dyn Any + Send>> {
        let token = self.token_named(type_id).ok_or_else(|| ConfiguratorError::UnsupportedType {
            type_id: type_id.to_string(),
        })?;
        self.bind_token(&token, node, ctx)
    }

    /// Export a live value, `Ok(None)` if its type declines export
    ///
    /// # Errors
    /// - `UnsupportedType` / `AmbiguousConverter` from dispatch
    /// - `Export` if serialization fails
    pub fn describe<T: Configurable>(
        &self,
        value: &T,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Option<Node>> {
        let token = TypeToken::of::<T>();
        let configurator = self.select(&token)?;
        configurator.describe(value, ctx).map_err(|e| {
            tracing::debug!(type_id = token.name(), error = %e, "describe failed");
            e
        })
    }

    /// The unique configurator accepting `token`
    #[must_use]
    pub fn lookup(&self, token: &TypeToken) -> Option<&dyn Configurator> {
        self.select(token).ok()
    }

    /// Token registered under a `TYPE_ID`
    #[must_use]
    pub fn token_named(&self, type_id: &str) -> Option<TypeToken> {
        self.by_name.get(type_id).copied()
    }

    /// Every registered target type
    #[must_use]
    pub fn tokens(&self) -> Vec<TypeToken> {
        let mut tokens: Vec<_> = self.by_name.values().copied().collect();
        tokens.sort_unstable_by_key(TypeToken::name);
        tokens
    }

    /// Number of registrations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn select(&self, token: &TypeToken) -> ConfiguratorResult<&dyn Configurator> {
        let mut accepting = self.registrations.iter().filter(|r| r.accepts(token));
        match (accepting.next(), accepting.count()) {
            (None, _) => Err(ConfiguratorError::UnsupportedType {
                type_id: token.name().to_string(),
            }),
            (Some(registration), 0) => Ok(registration.configurator.as_ref()),
            (Some(_), rest) => Err(ConfiguratorError::AmbiguousConverter {
                type_id: token.name().to_string(),
                count: rest + 1,
            }),
        }
    }
}
