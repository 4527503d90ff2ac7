//! Configuration Management
//!
//! Loads named cloud profiles from `clouds.yaml`. A profile lists the
//! endpoint of each service per interface; there is no endpoint discovery.
//!
//! ```yaml
//! default_cloud: devstack
//! clouds:
//!   devstack:
//!     interface: public
//!     token: gAAAA...
//!     endpoints:
//!       network:
//!         public: http://devstack:9696
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable selecting the cloud profile
pub const CLOUD_ENV: &str = "CLOUDLAYER_CLOUD";

/// Environment variable overriding the profile's token
pub const TOKEN_ENV: &str = "CLOUDLAYER_TOKEN";

fn default_interface() -> String {
    crate::transport::DEFAULT_INTERFACE.to_string()
}

/// One cloud's connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudProfile {
    /// Pre-issued auth token sent as `X-Auth-Token`
    #[serde(default)]
    pub token: Option<String>,
    /// Endpoint interface used unless overridden
    #[serde(default = "default_interface")]
    pub interface: String,
    /// service type -> interface -> base URL
    #[serde(default)]
    pub endpoints: HashMap<String, HashMap<String, String>>,
    /// Per-request timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for CloudProfile {
    fn default() -> Self {
        Self {
            token: None,
            interface: default_interface(),
            endpoints: HashMap::new(),
            timeout_secs: None,
            user_agent: None,
        }
    }
}

/// Contents of clouds.yaml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Profile used when none is selected
    #[serde(default)]
    pub default_cloud: Option<String>,
    #[serde(default)]
    pub clouds: HashMap<String, CloudProfile>,
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudlayer").join("clouds.yaml"))
    }

    /// Load configuration from the default path, empty if absent or invalid
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get effective cloud name (CLI > environment > default_cloud > only profile)
    pub fn effective_cloud(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(str::to_string)
            .or_else(|| std::env::var(CLOUD_ENV).ok().filter(|s| !s.is_empty()))
            .or_else(|| self.default_cloud.clone())
            .or_else(|| {
                if self.clouds.len() == 1 {
                    self.clouds.keys().next().cloned()
                } else {
                    None
                }
            })
    }

    /// Resolve the profile to use, with the token override applied
    pub fn profile(&self, requested: Option<&str>) -> Result<CloudProfile> {
        let name = self
            .effective_cloud(requested)
            .context("No cloud selected. Use --cloud, set CLOUDLAYER_CLOUD or default_cloud")?;

        let mut profile = self
            .clouds
            .get(&name)
            .cloned()
            .with_context(|| format!("Cloud '{}' not found in configuration", name))?;

        if let Some(token) = std::env::var(TOKEN_ENV).ok().filter(|s| !s.is_empty()) {
            profile.token = Some(token);
        }

        tracing::info!("Using cloud profile '{}'", name);
        Ok(profile)
    }
}
