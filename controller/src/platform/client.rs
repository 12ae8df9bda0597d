//! Thin Kubernetes access layer behind a mockable trait

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::platform::types::{Error, Result};

/// Namespaced object the controller can manage through a typed API
pub trait ClusterObject:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
}

impl<K> ClusterObject for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static
{
}

/// Result of a create attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The object was created by this call
    Created,
    /// Another writer created the object first
    AlreadyExists,
}

/// Cluster reads and writes used by the convergence passes
#[async_trait]
pub trait ResourceOps: Send + Sync {
    /// Fetch an object, returning `None` when it does not exist
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create an object, reporting a concurrent create as a benign outcome
    async fn create<K: ClusterObject>(&self, object: &K) -> Result<CreateOutcome>;

    /// Replace an existing object with the given state
    async fn update<K: ClusterObject>(&self, object: &K) -> Result<()>;
}

/// `ResourceOps` backed by a real API server connection
#[derive(Clone)]
pub struct KubeResourceOps {
    client: kube::Client,
}

impl KubeResourceOps {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K: ClusterObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ResourceOps for KubeResourceOps {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        match self.api::<K>(namespace).get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Error::Kube(e)),
        }
    }

    async fn create<K: ClusterObject>(&self, object: &K) -> Result<CreateOutcome> {
        let namespace = object.namespace().unwrap_or_default();
        match self
            .api::<K>(&namespace)
            .create(&PostParams::default(), object)
            .await
        {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(name = %object.name_any(), "object already exists, continuing");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }

    async fn update<K: ClusterObject>(&self, object: &K) -> Result<()> {
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name_any();
        self.api::<K>(&namespace)
            .replace(&name, &PostParams::default(), object)
            .await?;
        Ok(())
    }
}
