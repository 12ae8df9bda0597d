//! In-memory fakes shared by the platform tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::core::ErrorResponse;
use kube::{Resource, ResourceExt};
use serde_json::{json, Value};

use crate::crds::{Platform, PlatformSpec};
use crate::platform::client::{ClusterObject, CreateOutcome, ResourceOps};
use crate::platform::credentials::AccountDirectory;
use crate::platform::types::{Error, Result};

/// A platform spec that passes validation, in a namespace, with a uid
pub fn sample_platform(name: &str, namespace: &str) -> Platform {
    let spec: PlatformSpec = serde_json::from_value(json!({
        "broker": { "secretName": format!("{name}-mqtt-cert") },
        "kafka": { "bootstrapServers": "kafka-bootstrap:9092" },
        "gateway": {
            "grpc": {
                "host": "api.example.com",
                "tls": [{ "hosts": ["api.example.com"], "secretName": "api-tls" }]
            },
            "rest": { "host": "rest.example.com" }
        },
        "app": { "host": "console.example.com" }
    }))
    .unwrap();

    let mut platform = Platform::new(name, spec);
    platform.metadata.namespace = Some(namespace.to_string());
    platform.metadata.uid = Some("a1b2c3d4".to_string());
    platform
}

type ObjectKey = (String, String, String);

/// In-memory stand-in for the cluster, keyed by (kind, namespace, name)
#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    create_log: Mutex<Vec<String>>,
    fail_creates_from: Mutex<Option<usize>>,
    conceal_next_get: AtomicBool,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the first `n` creates succeed and fail every one after
    pub fn failing_after(n: usize) -> Self {
        let cluster = Self::default();
        *cluster.fail_creates_from.lock().unwrap() = Some(n);
        cluster
    }

    pub fn clear_failure(&self) {
        *self.fail_creates_from.lock().unwrap() = None;
    }

    /// Make the next get return `None` regardless of stored state,
    /// simulating a stale read racing a concurrent writer.
    pub fn conceal_next_get(&self) {
        self.conceal_next_get.store(true, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.creates.store(0, Ordering::SeqCst);
        self.updates.store(0, Ordering::SeqCst);
        self.create_log.lock().unwrap().clear();
    }

    /// Names passed to create, in call order
    pub fn create_log(&self) -> Vec<String> {
        self.create_log.lock().unwrap().clone()
    }

    pub fn stored<K: ClusterObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (
            K::kind(&()).to_string(),
            namespace.to_string(),
            name.to_string(),
        );
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Drop a pre-existing credential secret into the store without
    /// touching the call counters.
    pub fn seed_secret(&self, namespace: &str, name: &str, password: &str) {
        let secret: Value = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": name, "namespace": namespace },
            "stringData": { "username": "root", "password": password }
        });
        let key = (
            Secret::kind(&()).to_string(),
            namespace.to_string(),
            name.to_string(),
        );
        self.objects.lock().unwrap().insert(key, secret);
    }

    fn key_of<K: ClusterObject>(object: &K) -> ObjectKey {
        (
            K::kind(&()).to_string(),
            object.namespace().unwrap_or_default(),
            object.name_any(),
        )
    }

    fn injected_failure() -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "injected create failure".to_string(),
            reason: "ServiceUnavailable".to_string(),
            code: 503,
        }))
    }
}

#[async_trait]
impl ResourceOps for FakeCluster {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        if self.conceal_next_get.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.stored(namespace, name))
    }

    async fn create<K: ClusterObject>(&self, object: &K) -> Result<CreateOutcome> {
        if let Some(limit) = *self.fail_creates_from.lock().unwrap() {
            if self.creates() >= limit {
                return Err(Self::injected_failure());
            }
        }

        let key = Self::key_of(object);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        objects.insert(key.clone(), serde_json::to_value(object)?);
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.create_log
            .lock()
            .unwrap()
            .push(format!("{}/{}", key.0, key.2));
        Ok(CreateOutcome::Created)
    }

    async fn update<K: ClusterObject>(&self, object: &K) -> Result<()> {
        let key = Self::key_of(object);
        self.objects
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(object)?);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory account directory
#[derive(Default)]
pub struct FakeDirectory {
    accounts: Mutex<HashMap<String, String>>,
    reachable: bool,
    created: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::default()
        }
    }

    pub fn with_account(username: &str, password: &str) -> Self {
        let directory = Self::new();
        directory
            .accounts
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
        directory
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.accounts.lock().unwrap().get(username).cloned()
    }

    pub fn accounts_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::Directory("directory unreachable".to_string()))
        }
    }
}

#[async_trait]
impl AccountDirectory for FakeDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        self.check_reachable()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(username)
            .is_some_and(|stored| stored == password))
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<bool> {
        self.check_reachable()?;
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get_mut(username) {
            Some(stored) => {
                *stored = password.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_account(&self, username: &str, password: &str) -> Result<String> {
        self.check_reachable()?;
        self.accounts
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("account-{id}"))
    }
}
