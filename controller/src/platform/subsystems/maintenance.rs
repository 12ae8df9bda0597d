//! Scheduled maintenance: nightly rotation of the root credential by
//! deleting its secret, which the next convergence pass regenerates.

use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use serde_json::json;

use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::credentials::root_secret_name;
use crate::platform::types::Result;

pub fn descriptors(
    instance: &str,
    namespace: &str,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let rotator = format!("{instance}-credential-rotator");
    let secret = root_secret_name(instance);

    let account: ServiceAccount = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": { "name": rotator, "namespace": namespace }
    }))?;

    let role: Role = serde_json::from_value(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "Role",
        "metadata": { "name": rotator, "namespace": namespace },
        "rules": [{
            "apiGroups": [""],
            "resources": ["secrets"],
            "resourceNames": [secret],
            "verbs": ["get", "delete"]
        }]
    }))?;

    let binding: RoleBinding = serde_json::from_value(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "RoleBinding",
        "metadata": { "name": rotator, "namespace": namespace },
        "subjects": [{
            "kind": "ServiceAccount",
            "name": rotator,
            "namespace": namespace
        }],
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "Role",
            "name": rotator
        }
    }))?;

    let cronjob: CronJob = serde_json::from_value(json!({
        "apiVersion": "batch/v1",
        "kind": "CronJob",
        "metadata": {
            "name": format!("{instance}-rotate-root-credential"),
            "namespace": namespace
        },
        "spec": {
            "schedule": "0 0 * * *",
            "concurrencyPolicy": "Forbid",
            "jobTemplate": {
                "spec": {
                    "template": {
                        "spec": {
                            "serviceAccountName": rotator,
                            "restartPolicy": "OnFailure",
                            "containers": [{
                                "name": "rotate",
                                "image": config.images.kubectl_image,
                                "command": [
                                    "kubectl", "delete", "secret",
                                    secret, "--ignore-not-found"
                                ]
                            }]
                        }
                    }
                }
            }
        }
    }))?;

    Ok(vec![
        Descriptor::ServiceAccount(account),
        Descriptor::Role(role),
        Descriptor::RoleBinding(binding),
        Descriptor::CronJob(cronjob),
    ])
}
