//! Resource Registry - Load resource type definitions from JSON
//!
//! This module loads every resource type definition from embedded JSON
//! files and provides lookup functions for the lifecycle engine.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[include_str!("../resources/network.json")];

fn default_prefix() -> String {
    "provider".to_string()
}

fn default_true() -> bool {
    true
}

/// Provider option allow-list for a resource type
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDef {
    /// Wire namespace, `provider` gives `provider:<key>`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub keys: Vec<String>,
}

impl Default for ProviderDef {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            keys: Vec::new(),
        }
    }
}

/// Resource type definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    /// Service type the transport routes to
    pub service: String,
    /// Wrapper key of single-item bodies
    pub singular: String,
    /// Wrapper key of list bodies
    pub plural: String,
    /// Collection path without leading slash or suffix
    pub path: String,
    /// Whether paths carry a `.json` suffix
    #[serde(default = "default_true")]
    pub json_suffix: bool,
    /// Attributes the service filters on when passed as query parameters
    #[serde(default)]
    pub query_filters: Vec<String>,
    /// Whether the type has an `admin_state_up` attribute
    #[serde(default)]
    pub admin_state: bool,
    /// Wire attribute receiving the owning project
    #[serde(default)]
    pub project_attr: Option<String>,
    /// Wire attribute set when the resource is created as external
    #[serde(default)]
    pub external_attr: Option<String>,
    #[serde(default)]
    pub provider: ProviderDef,
    /// Attributes that must be present in a create body
    #[serde(default)]
    pub required: Vec<String>,
    /// Whether `GET <path>/<id>` is available for lookups
    #[serde(default)]
    pub direct_lookup: bool,
}

impl ResourceDef {
    /// True when every key can be handed to the service as a query parameter
    pub fn filters_server_side<'a>(&self, mut keys: impl Iterator<Item = &'a String>) -> bool {
        keys.all(|key| self.query_filters.iter().any(|f| f == key))
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get a resource definition by key or by singular name (`network`)
pub fn find_resource(name: &str) -> Option<&'static ResourceDef> {
    get_resource(name).or_else(|| {
        get_registry()
            .resources
            .values()
            .find(|def| def.singular == name)
    })
}

/// Get all resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}
