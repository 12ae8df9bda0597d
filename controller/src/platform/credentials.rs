//! Root credential bootstrap
//!
//! The administrative credential lives in two places: a namespaced
//! Secret and the account record inside the platform's own directory
//! service. Each pass converges both toward agreement, and the secret
//! is only persisted after the directory accepted the value, so a
//! half-finished pass can always be replayed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::json;
use tracing::{info, warn};

use crate::platform::client::{CreateOutcome, ResourceOps};
use crate::platform::types::{Error, Result, ROOT_USERNAME};

/// Account management surface of the directory service
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `Ok(true)` when the credential is accepted, `Ok(false)` when it
    /// is rejected; `Err` only for transport failures.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool>;

    /// `Ok(false)` when no such account exists
    async fn set_password(&self, username: &str, password: &str) -> Result<bool>;

    /// Returns the new account id
    async fn create_account(&self, username: &str, password: &str) -> Result<String>;
}

/// Name of the secret holding the root credential
pub fn root_secret_name(instance: &str) -> String {
    format!("{instance}-root-credential")
}

/// 32 bytes from the OS CSPRNG, base64-encoded
pub fn generate_password() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

/// Drive the directory's root account toward the given password:
/// accept it as-is, reset it on an existing account, or create the
/// account from scratch.
async fn assert_directory_credential<D: AccountDirectory>(
    directory: &D,
    password: &str,
) -> Result<()> {
    if directory.authenticate(ROOT_USERNAME, password).await? {
        return Ok(());
    }
    if directory.set_password(ROOT_USERNAME, password).await? {
        info!(username = ROOT_USERNAME, "reset directory password");
        return Ok(());
    }
    let id = directory.create_account(ROOT_USERNAME, password).await?;
    info!(username = ROOT_USERNAME, %id, "created directory account");
    Ok(())
}

/// Converge the root credential for one platform instance
pub async fn sync_root_credential<C, D>(
    ops: &C,
    directory: &D,
    owner: &OwnerReference,
    namespace: &str,
    instance: &str,
) -> Result<()>
where
    C: ResourceOps,
    D: AccountDirectory,
{
    let name = root_secret_name(instance);

    match ops.get::<Secret>(namespace, &name).await? {
        Some(secret) => reassert_from_secret(directory, &secret, &name).await,
        None => {
            let password = generate_password();
            assert_directory_credential(directory, &password).await?;

            let mut secret = credential_secret(&name, namespace, &password)?;
            secret.metadata.owner_references = Some(vec![owner.clone()]);

            match ops.create(&secret).await? {
                CreateOutcome::Created => {
                    info!(secret = %name, "persisted root credential");
                    Ok(())
                }
                CreateOutcome::AlreadyExists => {
                    // Another pass won the race; its value is the truth.
                    match ops.get::<Secret>(namespace, &name).await? {
                        Some(existing) => {
                            reassert_from_secret(directory, &existing, &name).await
                        }
                        None => {
                            warn!(secret = %name, "credential secret vanished mid-pass");
                            Ok(())
                        }
                    }
                }
            }
        }
    }
}

async fn reassert_from_secret<D: AccountDirectory>(
    directory: &D,
    secret: &Secret,
    name: &str,
) -> Result<()> {
    match stored_password(secret) {
        Some(password) => assert_directory_credential(directory, &password).await,
        None => {
            warn!(secret = %name, "secret has no password key, skipping");
            Ok(())
        }
    }
}

fn credential_secret(name: &str, namespace: &str, password: &str) -> Result<Secret> {
    let object = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name, "namespace": namespace },
        "stringData": {
            "username": ROOT_USERNAME,
            "password": password
        }
    });
    Ok(serde_json::from_value(object)?)
}

fn stored_password(secret: &Secret) -> Option<String> {
    if let Some(data) = &secret.data {
        if let Some(bytes) = data.get("password") {
            return String::from_utf8(bytes.0.clone())
                .ok()
                .map(|s| s.trim_end_matches('\n').to_string());
        }
    }
    secret
        .string_data
        .as_ref()
        .and_then(|data| data.get("password"))
        .map(|s| s.trim_end_matches('\n').to_string())
}

/// `AccountDirectory` over the directory service's JSON API
pub struct HttpAccountDirectory {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAccountDirectory {
    /// Address the directory deployed for the given instance by its
    /// in-cluster service name.
    pub fn for_instance(instance: &str, namespace: &str, port: u16) -> Self {
        Self {
            base_url: format!(
                "http://{instance}-directory.{namespace}.svc.cluster.local:{port}"
            ),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, username: &str, password: &str) -> Result<reqwest::Response> {
        self.http
            .post(format!("{}{path}", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| Error::Directory(format!("directory unreachable: {e}")))
    }
}

#[async_trait]
impl AccountDirectory for HttpAccountDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let response = self.post("/accounts/authenticate", username, password).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(false),
            s => Err(Error::Directory(format!("authenticate failed: {s}"))),
        }
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<bool> {
        let response = self.post("/accounts/password", username, password).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(Error::Directory(format!("set_password failed: {s}"))),
        }
    }

    async fn create_account(&self, username: &str, password: &str) -> Result<String> {
        let response = self.post("/accounts", username, password).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Directory(format!("create_account failed: {status}")));
        }

        #[derive(serde::Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = response
            .json()
            .await
            .map_err(|e| Error::Directory(format!("invalid create_account response: {e}")))?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{FakeCluster, FakeDirectory};

    fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "iotmesh.dev/v1beta1".to_string(),
            kind: "Platform".to_string(),
            name: "factory".to_string(),
            uid: "1234-5678".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn generated_password_decodes_to_32_bytes() {
        let password = generate_password();
        let bytes = BASE64_STANDARD.decode(&password).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_ne!(password, generate_password());
    }

    #[tokio::test]
    async fn bootstraps_from_nothing() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::new();

        sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap();

        let secret: Secret = cluster.stored("iot", "factory-root-credential").unwrap();
        let password = stored_password(&secret).unwrap();
        assert_eq!(directory.password_of(ROOT_USERNAME).unwrap(), password);
        assert_eq!(directory.accounts_created(), 1);

        let refs = secret.metadata.owner_references.unwrap();
        assert_eq!(refs[0].name, "factory");
    }

    #[tokio::test]
    async fn reasserts_stored_value_after_directory_reset() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::with_account(ROOT_USERNAME, "drifted-elsewhere");
        cluster.seed_secret("iot", "factory-root-credential", "stored-password");

        sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap();

        assert_eq!(
            directory.password_of(ROOT_USERNAME).unwrap(),
            "stored-password"
        );
        // The secret itself is never rewritten.
        assert_eq!(cluster.updates(), 0);
        assert_eq!(cluster.creates(), 0);
    }

    #[tokio::test]
    async fn creates_missing_account_for_existing_secret() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::new();
        cluster.seed_secret("iot", "factory-root-credential", "stored-password");

        sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap();

        assert_eq!(directory.accounts_created(), 1);
        assert_eq!(
            directory.password_of(ROOT_USERNAME).unwrap(),
            "stored-password"
        );
    }

    #[tokio::test]
    async fn unreachable_directory_persists_nothing() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::unreachable();

        let err = sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Directory(_)));
        assert_eq!(cluster.creates(), 0);
        assert!(cluster
            .stored::<Secret>("iot", "factory-root-credential")
            .is_none());
    }

    #[tokio::test]
    async fn missing_password_key_is_skipped() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::new();

        let secret: Secret = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "factory-root-credential", "namespace": "iot" },
            "stringData": { "username": "root" }
        }))
        .unwrap();
        cluster.create(&secret).await.unwrap();
        cluster.reset_counters();

        sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap();

        assert_eq!(directory.accounts_created(), 0);
        assert_eq!(cluster.creates(), 0);
    }

    #[tokio::test]
    async fn lost_create_race_defers_to_the_winner() {
        let cluster = FakeCluster::new();
        let directory = FakeDirectory::with_account(ROOT_USERNAME, "winner-password");
        cluster.seed_secret("iot", "factory-root-credential", "winner-password");

        // Stale read: the secret looks absent, the create collides.
        cluster.conceal_next_get();
        sync_root_credential(&cluster, &directory, &owner(), "iot", "factory")
            .await
            .unwrap();

        // The winner's value survives in both stores.
        assert_eq!(
            directory.password_of(ROOT_USERNAME).unwrap(),
            "winner-password"
        );
        let secret: Secret = cluster.stored("iot", "factory-root-credential").unwrap();
        assert_eq!(stored_password(&secret).unwrap(), "winner-password");
    }
}
