//! Descriptor builders, one module per subsystem family
//!
//! Builders are pure: they turn a platform spec plus operator config
//! into typed child objects, named `<instance>-<suffix>`. Deployments
//! are labeled and selected with the `deployment` key, StatefulSets
//! with `app`, matching what their Services select on.

pub mod broker;
pub mod datastore;
pub mod directory;
pub mod gateway;
pub mod maintenance;
pub mod shadow;
pub mod timeseries;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use serde_json::{json, Value};

use crate::crds::TlsConfig;
use crate::platform::types::Result;

/// Single-replica Deployment wrapper around a pod spec
pub(crate) fn workload_deployment(
    name: &str,
    namespace: &str,
    pod_spec: Value,
) -> Result<Deployment> {
    let object = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "deployment": name }
        },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": { "deployment": name } },
            "template": {
                "metadata": { "labels": { "deployment": name } },
                "spec": pod_spec
            }
        }
    });
    Ok(serde_json::from_value(object)?)
}

/// ClusterIP Service in front of a Deployment
pub(crate) fn deployment_service(name: &str, namespace: &str, ports: Value) -> Result<Service> {
    let object = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "namespace": namespace },
        "spec": {
            "selector": { "deployment": name },
            "ports": ports
        }
    });
    Ok(serde_json::from_value(object)?)
}

/// Headless Service for StatefulSet peer discovery
pub(crate) fn headless_service(name: &str, namespace: &str, ports: Value) -> Result<Service> {
    let object = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "namespace": namespace },
        "spec": {
            "clusterIP": "None",
            "selector": { "app": name },
            "ports": ports
        }
    });
    Ok(serde_json::from_value(object)?)
}

/// StatefulSet with a single `datadir` volume claim template
pub(crate) fn stateful_set(
    name: &str,
    namespace: &str,
    replicas: i32,
    storage: &str,
    pod_spec: Value,
) -> Result<StatefulSet> {
    let object = json!({
        "apiVersion": "apps/v1",
        "kind": "StatefulSet",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "app": name }
        },
        "spec": {
            "replicas": replicas,
            "serviceName": name,
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": pod_spec
            },
            "volumeClaimTemplates": [{
                "metadata": { "name": "datadir" },
                "spec": {
                    "accessModes": ["ReadWriteOnce"],
                    "resources": { "requests": { "storage": storage } }
                }
            }]
        }
    });
    Ok(serde_json::from_value(object)?)
}

/// Soft anti-affinity spreading a StatefulSet's pods across nodes
pub(crate) fn spread_affinity(name: &str) -> Value {
    json!({
        "podAntiAffinity": {
            "preferredDuringSchedulingIgnoredDuringExecution": [{
                "weight": 100,
                "podAffinityTerm": {
                    "labelSelector": {
                        "matchExpressions": [{
                            "key": "app",
                            "operator": "In",
                            "values": [name]
                        }]
                    },
                    "topologyKey": "kubernetes.io/hostname"
                }
            }]
        }
    })
}

/// Ingress routing one public host to a backing service port
pub(crate) fn public_ingress(
    name: &str,
    namespace: &str,
    host: &str,
    tls: &[TlsConfig],
    service: &str,
    port: u16,
    annotations: Value,
) -> Result<Ingress> {
    let tls_entries: Vec<Value> = tls
        .iter()
        .map(|t| {
            json!({
                "hosts": t.hosts,
                "secretName": t.secret_name
            })
        })
        .collect();

    let object = json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "annotations": annotations
        },
        "spec": {
            "tls": tls_entries,
            "rules": [{
                "host": host,
                "http": {
                    "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {
                            "service": {
                                "name": service,
                                "port": { "number": port }
                            }
                        }
                    }]
                }
            }]
        }
    });
    Ok(serde_json::from_value(object)?)
}
