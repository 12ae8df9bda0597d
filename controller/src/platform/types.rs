//! Shared types for the platform controller

use std::sync::Arc;

use crate::platform::config::OperatorConfig;

/// Username of the built-in administrative account
pub const ROOT_USERNAME: &str = "root";

/// Errors surfaced by the platform controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("invalid platform spec: {0}")]
    Validation(String),

    #[error("account directory error: {0}")]
    Directory(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shared state handed to every reconciliation
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: kube::Client,
    /// Operator configuration
    pub config: Arc<OperatorConfig>,
}
