//! Operator configuration, mounted into the pod as a YAML file

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::platform::types::{Error, Result};

/// Where workload container images come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSource {
    /// Container registry host
    pub registry: String,
    /// Repository under the registry holding platform images
    pub repo: String,
    /// Tag applied to every platform image
    pub tag: String,
    /// Graph datastore image (third-party, pinned independently)
    pub datastore_image: String,
    /// In-memory cache image backing the shadow subsystem
    pub cache_image: String,
    /// Time-series database image
    pub timeseries_image: String,
    /// Image used by maintenance cronjobs to call the API server
    pub kubectl_image: String,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self {
            registry: "quay.io".to_string(),
            repo: "iotmesh".to_string(),
            tag: "latest".to_string(),
            datastore_image: "dgraph/dgraph:v20.11.3".to_string(),
            cache_image: "redis:6.2-alpine".to_string(),
            timeseries_image: "timescale/timescaledb:2.14.2-pg16".to_string(),
            kubectl_image: "bitnami/kubectl:1.31".to_string(),
        }
    }
}

impl ImageSource {
    /// Full image reference for a first-party platform component
    pub fn platform_image(&self, component: &str) -> String {
        format!("{}/{}/{}:{}", self.registry, self.repo, component, self.tag)
    }
}

/// Storage defaults applied when a platform spec leaves them unset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageDefaults {
    /// Volume claim size used when the spec does not request one
    pub default_size: String,
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            default_size: "10Gi".to_string(),
        }
    }
}

/// How the controller reaches a platform's account directory service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryConfig {
    /// Port the directory service listens on
    pub port: u16,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Top-level operator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    pub images: ImageSource,
    pub storage: StorageDefaults,
    pub directory: DirectoryConfig,
    /// Seconds between steady-state reconciliation passes
    pub requeue_seconds: u64,
}

impl OperatorConfig {
    /// Load configuration from a mounted YAML file, falling back to
    /// defaults when the file is absent.
    pub fn from_mounted_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.images.registry.is_empty() {
            return Err(Error::Config("images.registry must not be empty".into()));
        }
        if self.images.repo.is_empty() {
            return Err(Error::Config("images.repo must not be empty".into()));
        }
        if self.images.tag.is_empty() {
            return Err(Error::Config("images.tag must not be empty".into()));
        }
        if self.storage.default_size.is_empty() {
            return Err(Error::Config(
                "storage.defaultSize must not be empty".into(),
            ));
        }
        if self.directory.port == 0 {
            return Err(Error::Config("directory.port must not be zero".into()));
        }
        Ok(())
    }

    /// Seconds between steady-state passes, with a sane floor
    pub fn requeue_seconds(&self) -> u64 {
        if self.requeue_seconds == 0 {
            300
        } else {
            self.requeue_seconds
        }
    }
}
