//! Gatekeeper configuration loading and validation
//!
//! ```toml
//! [catalog]
//! path = "permissions.txt"
//!
//! [engine]
//! expansion_cache = true
//! expansion_cache_capacity = 1024
//! enable_metrics = true
//!
//! [credentials]
//! session_ttl_secs = 3600
//! refresh_window_secs = 604800
//! api_key_ttl_days = 90
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::PermissionCatalog;
use crate::credential::CredentialConfig;
use crate::engine::EngineConfig;
use crate::error::{AuthzError, Result};

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatekeeperConfig {
    #[serde(default)]
    pub catalog: CatalogSection,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub credentials: CredentialConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogSection {
    /// Permission manifest, relative paths resolve against the config file
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf { PathBuf::from("permissions.txt") }

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl GatekeeperConfig {
    /// Load configuration from a TOML file
    ///
    /// A relative catalog path is resolved against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthzError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml(&contents)?;
        if config.catalog.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.catalog.path = dir.join(&config.catalog.path);
            }
        }

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.catalog.path.as_os_str().is_empty() {
            return Err(AuthzError::Config("catalog.path must not be empty".to_string()));
        }

        self.credentials.validate()
    }

    /// Load the catalog the configuration points at
    pub fn load_catalog(&self) -> Result<PermissionCatalog> {
        PermissionCatalog::load(&self.catalog.path)
    }
}
