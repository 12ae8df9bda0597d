//! Drift detection for the mutable subset of managed workload kinds
//!
//! Only fields the platform spec actually drives are compared and
//! corrected. Everything else (annotations added by other controllers,
//! defaulted fields, status) is left untouched, and fields the API
//! server rejects updates to (selectors, volume claim templates) are
//! never written.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;

/// Kinds with an in-place update path. `drifted` decides whether the
/// observed object needs correction; `overwrite` projects the desired
/// subset onto the observed object so the replace call preserves
/// server-managed metadata.
pub trait MutableSubset {
    fn drifted(desired: &Self, observed: &Self) -> bool;
    fn overwrite(desired: &Self, observed: &mut Self);
}

impl MutableSubset for Deployment {
    fn drifted(desired: &Self, observed: &Self) -> bool {
        match (&desired.spec, &observed.spec) {
            (Some(want), Some(have)) => {
                want.replicas != have.replicas || want.template != have.template
            }
            (None, None) => false,
            _ => true,
        }
    }

    fn overwrite(desired: &Self, observed: &mut Self) {
        match (&desired.spec, &mut observed.spec) {
            (Some(want), Some(have)) => {
                have.replicas = want.replicas;
                have.template = want.template.clone();
            }
            _ => observed.spec = desired.spec.clone(),
        }
    }
}

impl MutableSubset for StatefulSet {
    fn drifted(desired: &Self, observed: &Self) -> bool {
        match (&desired.spec, &observed.spec) {
            (Some(want), Some(have)) => {
                want.replicas != have.replicas || want.template != have.template
            }
            (None, None) => false,
            _ => true,
        }
    }

    fn overwrite(desired: &Self, observed: &mut Self) {
        match (&desired.spec, &mut observed.spec) {
            (Some(want), Some(have)) => {
                have.replicas = want.replicas;
                have.template = want.template.clone();
            }
            _ => observed.spec = desired.spec.clone(),
        }
    }
}

impl MutableSubset for CronJob {
    fn drifted(desired: &Self, observed: &Self) -> bool {
        match (&desired.spec, &observed.spec) {
            (Some(want), Some(have)) => {
                want.schedule != have.schedule
                    || want.concurrency_policy != have.concurrency_policy
                    || want.job_template != have.job_template
            }
            (None, None) => false,
            _ => true,
        }
    }

    fn overwrite(desired: &Self, observed: &mut Self) {
        match (&desired.spec, &mut observed.spec) {
            (Some(want), Some(have)) => {
                have.schedule = want.schedule.clone();
                have.concurrency_policy = want.concurrency_policy.clone();
                have.job_template = want.job_template.clone();
            }
            _ => observed.spec = desired.spec.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(replicas: i32, image: &str, selector_app: &str) -> Deployment {
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "demo", "namespace": "default" },
            "spec": {
                "replicas": replicas,
                "selector": { "matchLabels": { "app": selector_app } },
                "template": {
                    "metadata": { "labels": { "app": "demo" } },
                    "spec": {
                        "containers": [{ "name": "demo", "image": image }]
                    }
                }
            }
        }))
        .unwrap()
    }

    fn stateful_set(storage: &str) -> StatefulSet {
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": { "name": "demo", "namespace": "default" },
            "spec": {
                "replicas": 3,
                "serviceName": "demo",
                "selector": { "matchLabels": { "app": "demo" } },
                "template": {
                    "metadata": { "labels": { "app": "demo" } },
                    "spec": {
                        "containers": [{ "name": "demo", "image": "demo:1" }]
                    }
                },
                "volumeClaimTemplates": [{
                    "metadata": { "name": "datadir" },
                    "spec": {
                        "accessModes": ["ReadWriteOnce"],
                        "resources": { "requests": { "storage": storage } }
                    }
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn identical_deployments_are_not_drifted() {
        let a = deployment(1, "demo:1", "demo");
        let b = deployment(1, "demo:1", "demo");
        assert!(!Deployment::drifted(&a, &b));
    }

    #[test]
    fn replica_and_template_changes_count_as_drift() {
        let desired = deployment(2, "demo:1", "demo");
        let observed = deployment(1, "demo:1", "demo");
        assert!(Deployment::drifted(&desired, &observed));

        let desired = deployment(1, "demo:2", "demo");
        let observed = deployment(1, "demo:1", "demo");
        assert!(Deployment::drifted(&desired, &observed));
    }

    #[test]
    fn selector_differences_are_ignored() {
        let desired = deployment(1, "demo:1", "demo");
        let observed = deployment(1, "demo:1", "legacy-selector");
        assert!(!Deployment::drifted(&desired, &observed));
    }

    #[test]
    fn overwrite_preserves_observed_selector() {
        let desired = deployment(3, "demo:2", "demo");
        let mut observed = deployment(1, "demo:1", "legacy-selector");
        Deployment::overwrite(&desired, &mut observed);

        let spec = observed.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(
            spec.selector.match_labels.unwrap().get("app").unwrap(),
            "legacy-selector"
        );
        let image = spec.template.spec.unwrap().containers[0].image.clone();
        assert_eq!(image.as_deref(), Some("demo:2"));
    }

    #[test]
    fn volume_claim_differences_are_ignored() {
        let desired = stateful_set("50Gi");
        let observed = stateful_set("10Gi");
        assert!(!StatefulSet::drifted(&desired, &observed));
    }

    #[test]
    fn stateful_set_overwrite_keeps_volume_claims() {
        let desired = stateful_set("50Gi");
        let mut observed = stateful_set("10Gi");
        StatefulSet::overwrite(&desired, &mut observed);

        let claims = observed.spec.unwrap().volume_claim_templates.unwrap();
        let storage = claims[0]
            .spec
            .clone()
            .unwrap()
            .resources
            .unwrap()
            .requests
            .unwrap()
            .get("storage")
            .cloned()
            .unwrap();
        assert_eq!(storage.0, "10Gi");
    }

    #[test]
    fn cronjob_schedule_change_is_drift() {
        let make = |schedule: &str| -> CronJob {
            serde_json::from_value(json!({
                "apiVersion": "batch/v1",
                "kind": "CronJob",
                "metadata": { "name": "demo", "namespace": "default" },
                "spec": {
                    "schedule": schedule,
                    "concurrencyPolicy": "Forbid",
                    "jobTemplate": {
                        "spec": {
                            "template": {
                                "spec": {
                                    "restartPolicy": "OnFailure",
                                    "containers": [{ "name": "job", "image": "job:1" }]
                                }
                            }
                        }
                    }
                }
            }))
            .unwrap()
        };

        assert!(!CronJob::drifted(&make("0 0 * * *"), &make("0 0 * * *")));
        assert!(CronJob::drifted(&make("0 0 * * *"), &make("0 6 * * *")));
    }
}
