//! Type-specific configurators
//!
//! [`Configurator`] is the type-erased interface the registry stores.
//! [`ResourceConfigurator`] implements it for any [`Configurable`] type by
//! bridging through the type's serde schema object:
//!
//! ```text
//! bind:     Node ─resolve secrets─▶ Node ─render─▶ YAML ─serde─▶ Resource ─into_model─▶ T
//! describe: T ─resource()─▶ Resource ─serde─▶ YAML ─parse─▶ Node ─escape literals─▶ Node
//! ```
//!
//! On export every scalar that is not a masked reference has its `${`
//! escaped as `^${`, so binding the exported node yields the same text.
//!
//! A resolved value that occurs both as a reference and as a literal (or
//! from two references) cannot be matched to its `Secret` field by value.
//! For those, bind first deserializes a copy of the document with each such
//! reference replaced by a [`SecretTrace`] marker, and replays which field
//! read which marker during the real pass.

use crate::context::ConfigurationContext;
use crate::error::{ConfiguratorError, ConfiguratorResult};
use crate::resource::{Configurable, DecodeError, ResourceSchema};
use crate::token::TypeToken;
use casc_model::{Node, NodePath, Scalar};
use casc_secrets::{ExportPolicy, SecretOrigins, SecretResolver, SecretTrace};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

/// Type-erased converter between nodes and one domain type
pub trait Configurator: Send + Sync + 'static {
    /// Type this configurator produces
    fn target(&self) -> TypeToken;

    /// Whether the target takes part in export
    fn exportable(&self) -> bool;

    /// Bind `node`, located at `path` below the context root
    ///
    /// # Errors
    /// Any document or schema failure; binding is all-or-nothing
    fn bind(
        &self,
        node: &Node,
        path: &NodePath,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Box<dyn Any + Send>>;

    /// Export a live value, `Ok(None)` if it declines
    ///
    /// # Errors
    /// `ConfiguratorError::Internal` if `value` is not the target type,
    /// `ConfiguratorError::Export` if serialization fails
    fn describe(&self, value: &dyn Any, ctx: &ConfigurationContext)
        -> ConfiguratorResult<Option<Node>>;
}

/// Schema-driven configurator for `T`
pub struct ResourceConfigurator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Configurable> ResourceConfigurator<T> {
    /// Create configurator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Bind `node` into a `T`
    ///
    /// # Errors
    /// - `Secret` if a reference in any scalar cannot be resolved
    /// - `SchemaDiscovery` if `T` exposes no resource schema
    /// - `SchemaBinding` if the resolved document does not fit the schema
    /// - `ModelConstruction` if the schema object rejects its values
    pub fn configure(
        &self,
        node: &Node,
        path: &NodePath,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<T> {
        let path = ctx.root().join(path);
        tracing::debug!(type_id = T::TYPE_ID, %path, "binding");

        let resolved = resolve_scalars(node, &path, ctx)?;
        let text = casc_model::render(&resolved.node)?;

        let schema = T::resource_schema().ok_or_else(|| ConfiguratorError::SchemaDiscovery {
            type_id: T::TYPE_ID.to_string(),
            path: path.clone(),
        })?;
        let origins = resolved.into_origins(schema)?;

        let value = origins.scope(|| schema.decode(&text)).map_err(|e| match e {
            DecodeError::Binding(source) => ConfiguratorError::SchemaBinding {
                type_id: T::TYPE_ID.to_string(),
                schema: schema.name(),
                path: path.clone(),
                source,
            },
            DecodeError::Construction(source) => ConfiguratorError::ModelConstruction {
                type_id: T::TYPE_ID.to_string(),
                path: path.clone(),
                source,
            },
        })?;

        tracing::debug!(type_id = T::TYPE_ID, %path, secrets = origins.len(), "bound");
        Ok(value)
    }

    /// Project a live `T` back into a document node
    ///
    /// `Ok(None)` when `T` is not exportable, has no schema, or the value
    /// declines export.
    ///
    /// # Errors
    /// `Export` if the schema object cannot be serialized or re-parsed
    pub fn export(&self, value: &T, ctx: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
        if !T::EXPORTABLE {
            return Ok(None);
        }
        let Some(schema) = T::resource_schema() else {
            return Ok(None);
        };

        let policy = ctx.export_policy();
        if policy == ExportPolicy::Plaintext {
            tracing::warn!(type_id = T::TYPE_ID, "exporting secrets in plaintext");
        }

        let Some(exported) = encode_node(schema, value, policy)? else {
            tracing::debug!(type_id = T::TYPE_ID, "value declined export");
            return Ok(None);
        };
        // Scalars that differ from their revealed form are masked references
        let revealed = match policy {
            ExportPolicy::MaskSecrets => encode_node(schema, value, ExportPolicy::Plaintext)?,
            ExportPolicy::Plaintext => None,
        };
        let node = escape_literals(&exported, revealed.as_ref());

        tracing::debug!(type_id = T::TYPE_ID, "described");
        Ok(Some(node))
    }
}

impl<T: Configurable> Default for ResourceConfigurator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Configurable> fmt::Debug for ResourceConfigurator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfigurator")
            .field("type_id", &T::TYPE_ID)
            .field("exportable", &T::EXPORTABLE)
            .finish()
    }
}

impl<T: Configurable> Configurator for ResourceConfigurator<T> {
    fn target(&self) -> TypeToken {
        TypeToken::of::<T>()
    }

    fn exportable(&self) -> bool {
        T::EXPORTABLE
    }

    fn bind(
        &self,
        node: &Node,
        path: &NodePath,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Box<dyn Any + Send>> {
        Ok(Box::new(self.configure(node, path, ctx)?))
    }

    fn describe(
        &self,
        value: &dyn Any,
        ctx: &ConfigurationContext,
    ) -> ConfiguratorResult<Option<Node>> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            ConfiguratorError::Internal(format!(
                "configurator for '{}' received a value of another type",
                T::TYPE_ID
            ))
        })?;
        self.export(value, ctx)
    }
}

/// Resolved tree plus where its referenced values came from
struct ResolvedTree {
    node: Node,
    origins: SecretOrigins,
    /// Referenced scalars whose value also occurs with another origin:
    /// relative path, resolved value, reference
    ambiguous: Vec<(NodePath, String, String)>,
}

impl ResolvedTree {
    /// Final origins for decoding, tracing ambiguous values through `schema`
    fn into_origins<T>(self, schema: ResourceSchema<T>) -> ConfiguratorResult<SecretOrigins> {
        let Self {
            node,
            mut origins,
            ambiguous,
        } = self;
        if ambiguous.is_empty() {
            return Ok(origins);
        }

        let mut trace = SecretTrace::new();
        let markers: HashMap<&NodePath, String> = ambiguous
            .iter()
            .map(|(path, resolved, reference)| (path, trace.mark(resolved.as_str(), reference.as_str())))
            .collect();
        let marked = node.map_scalars(|path, scalar| match markers.get(path) {
            Some(marker) => Scalar::string(marker.as_str()),
            None => scalar.clone(),
        });
        let text = casc_model::render(&marked)?;

        let (traced, log) = trace.scope(|| schema.validate(&text));
        match traced {
            Ok(()) => origins.attach_trace(log),
            Err(e) => {
                tracing::debug!(error = %e, "origin trace rejected, matching by value");
                for (_, resolved, reference) in ambiguous {
                    origins.record(resolved, reference);
                }
            }
        }
        Ok(origins)
    }
}

/// Resolve every scalar, remembering which ones held a reference
fn resolve_scalars(
    node: &Node,
    path: &NodePath,
    ctx: &ConfigurationContext,
) -> ConfiguratorResult<ResolvedTree> {
    let mut seen: Vec<(NodePath, String, Option<String>)> = Vec::new();
    let resolved = node.try_map_scalars(|relative, scalar| -> ConfiguratorResult<Scalar> {
        let value = ctx
            .resolver()
            .resolve(scalar.value())
            .map_err(|source| ConfiguratorError::Secret {
                path: path.join(relative),
                source,
            })?;
        let reference = SecretResolver::contains_reference(scalar.value())
            .then(|| scalar.value().to_string());
        seen.push((relative.clone(), value.clone(), reference));
        Ok(scalar.with_value(value))
    })?;

    // A value is ambiguous when two of its occurrences disagree on the origin
    let mut first: HashMap<&str, Option<&str>> = HashMap::new();
    let mut ambiguous_values: HashSet<&str> = HashSet::new();
    for (_, value, reference) in &seen {
        match first.get(value.as_str()) {
            None => {
                first.insert(value, reference.as_deref());
            }
            Some(existing) if *existing != reference.as_deref() => {
                ambiguous_values.insert(value);
            }
            Some(_) => {}
        }
    }

    let mut origins = SecretOrigins::new();
    let mut ambiguous = Vec::new();
    for (relative, value, reference) in &seen {
        let Some(reference) = reference else {
            continue;
        };
        if ambiguous_values.contains(value.as_str()) {
            ambiguous.push((relative.clone(), value.clone(), reference.clone()));
        } else {
            origins.record(value.as_str(), reference.as_str());
        }
    }

    Ok(ResolvedTree {
        node: resolved,
        origins,
        ambiguous,
    })
}

/// Serialize through the schema under `policy` and re-parse
fn encode_node<T: Configurable>(
    schema: ResourceSchema<T>,
    value: &T,
    policy: ExportPolicy,
) -> ConfiguratorResult<Option<Node>> {
    policy
        .scope(|| schema.encode(value))
        .map(|text| {
            let text = text.map_err(|e| ConfiguratorError::export(T::TYPE_ID, e))?;
            casc_model::parse(&text).map_err(|e| ConfiguratorError::export(T::TYPE_ID, e))
        })
        .transpose()
}

/// Escape `${` in every scalar that is not a masked reference
fn escape_literals(exported: &Node, revealed: Option<&Node>) -> Node {
    exported.map_scalars(|path, scalar| {
        let masked = revealed
            .and_then(|r| r.at(path))
            .and_then(Node::as_scalar)
            .is_some_and(|plain| plain.value() != scalar.value());
        if masked {
            scalar.clone()
        } else {
            scalar.with_value(SecretResolver::escape(scalar.value()))
        }
    })
}
