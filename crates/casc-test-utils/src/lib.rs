//! Testing utilities for CASC workspace
//!
//! Shared fixture types, secret sources and tracing setup.

#![allow(missing_docs)]

use casc_configurator::{
    ApiResource, Configurable, ConfigurationContext, ConfiguratorRegistry, HasResourceSchema,
    ModelConstructionError, ResourceSchema,
};
use casc_model::Node;
use casc_secrets::{MapSecretSource, Secret, SecretResolver, SecretSource, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Once, RwLock};

// Credential fixture

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernamePasswordCredentials {
    pub id: Option<String>,
    pub username: String,
    pub password: Secret,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsernamePasswordResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub password: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiResource for UsernamePasswordResource {
    type Model = UsernamePasswordCredentials;

    fn into_model(self) -> Result<UsernamePasswordCredentials, ModelConstructionError> {
        if self.username.trim().is_empty() {
            return Err(ModelConstructionError::new("username must not be blank"));
        }
        Ok(UsernamePasswordCredentials {
            id: self.id,
            username: self.username,
            password: self.password,
            description: self.description,
        })
    }
}

impl Configurable for UsernamePasswordCredentials {
    const TYPE_ID: &'static str = "usernamePassword";
    const EXPORTABLE: bool = true;

    fn resource_schema() -> Option<ResourceSchema<Self>> {
        Some(ResourceSchema::of())
    }
}

impl HasResourceSchema for UsernamePasswordCredentials {
    type Resource = UsernamePasswordResource;

    fn resource(&self) -> Option<UsernamePasswordResource> {
        Some(UsernamePasswordResource {
            id: self.id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            description: self.description.clone(),
        })
    }
}

pub fn credentials(username: &str, password: &str) -> UsernamePasswordCredentials {
    UsernamePasswordCredentials {
        id: None,
        username: username.to_string(),
        password: Secret::new(password),
        description: None,
    }
}

// Exportable type that never declared its schema

#[derive(Debug)]
pub struct LegacyExportable;

impl Configurable for LegacyExportable {
    const TYPE_ID: &'static str = "legacy";
    const EXPORTABLE: bool = true;
}

// Bindable, but declines export

#[derive(Debug, PartialEq, Eq)]
pub struct WriteOnlyToken {
    pub token: Secret,
}

#[derive(Serialize, Deserialize)]
pub struct WriteOnlyTokenResource {
    pub token: Secret,
}

impl ApiResource for WriteOnlyTokenResource {
    type Model = WriteOnlyToken;

    fn into_model(self) -> Result<WriteOnlyToken, ModelConstructionError> {
        Ok(WriteOnlyToken { token: self.token })
    }
}

impl Configurable for WriteOnlyToken {
    const TYPE_ID: &'static str = "writeOnlyToken";
    const EXPORTABLE: bool = true;

    fn resource_schema() -> Option<ResourceSchema<Self>> {
        Some(ResourceSchema::of())
    }
}

impl HasResourceSchema for WriteOnlyToken {
    type Resource = WriteOnlyTokenResource;

    fn resource(&self) -> Option<WriteOnlyTokenResource> {
        None
    }
}

// Not exportable: the default capability predicate rejects it

#[derive(Debug, PartialEq, Eq)]
pub struct InternalSetting {
    pub value: String,
}

#[derive(Serialize, Deserialize)]
pub struct InternalSettingResource {
    pub value: String,
}

impl ApiResource for InternalSettingResource {
    type Model = InternalSetting;

    fn into_model(self) -> Result<InternalSetting, ModelConstructionError> {
        Ok(InternalSetting { value: self.value })
    }
}

impl Configurable for InternalSetting {
    const TYPE_ID: &'static str = "internalSetting";

    fn resource_schema() -> Option<ResourceSchema<Self>> {
        Some(ResourceSchema::of())
    }
}

impl HasResourceSchema for InternalSetting {
    type Resource = InternalSettingResource;

    fn resource(&self) -> Option<InternalSettingResource> {
        Some(InternalSettingResource {
            value: self.value.clone(),
        })
    }
}

// Registry and context helpers

pub fn fixture_registry() -> ConfiguratorRegistry {
    ConfiguratorRegistry::builder()
        .resource::<UsernamePasswordCredentials>()
        .resource::<LegacyExportable>()
        .resource::<WriteOnlyToken>()
        .resource::<InternalSetting>()
        .build()
        .unwrap()
}

pub fn inline_source(pairs: &[(&str, &str)]) -> MapSecretSource {
    pairs
        .iter()
        .fold(MapSecretSource::new("inline"), |source, (k, v)| source.with(*k, *v))
}

pub fn context_with(pairs: &[(&str, &str)]) -> ConfigurationContext {
    ConfigurationContext::new(SecretResolver::new().with_source(inline_source(pairs)))
}

pub fn yaml(text: &str) -> Node {
    casc_model::parse(text).unwrap()
}

/// Secret source that counts reveals and can be told to fail
#[derive(Debug, Default)]
pub struct CountingSource {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSource {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretSource for CountingSource {
    fn name(&self) -> &str {
        if self.fail {
            "failing"
        } else {
            "counting"
        }
    }

    fn reveal(&self, _key: &str) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(SourceError::Backend("backend unavailable".to_string()))
        } else {
            Ok(None)
        }
    }
}

/// In-memory source whose values can change between binds; counts reveals
#[derive(Debug, Default)]
pub struct RotatingSource {
    values: RwLock<HashMap<String, String>>,
    reveals: AtomicUsize,
}

impl RotatingSource {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: RwLock::new(
                pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            reveals: AtomicUsize::new(0),
        }
    }

    pub fn rotate(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn reveals(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }
}

impl SecretSource for RotatingSource {
    fn name(&self) -> &str {
        "rotating"
    }

    fn reveal(&self, key: &str) -> Result<Option<String>, SourceError> {
        self.reveals.fetch_add(1, Ordering::SeqCst);
        let values = self
            .values
            .read()
            .map_err(|_| SourceError::Backend("poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }
}

static TRACING: Once = Once::new();

/// Install a test subscriber once, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
