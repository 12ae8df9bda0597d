//! Graph datastore cluster: coordination ("zero") and data ("alpha")
//! StatefulSets, each behind a headless peer-discovery Service.

use serde_json::json;

use crate::crds::PlatformSpec;
use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::subsystems::{headless_service, spread_affinity, stateful_set};
use crate::platform::types::Result;

const REPLICAS: i32 = 3;

pub fn descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let storage = spec
        .datastore
        .storage
        .clone()
        .unwrap_or_else(|| config.storage.default_size.clone());

    let zero = format!("{instance}-graph-zero");
    let alpha = format!("{instance}-graph-alpha");
    let image = &config.images.datastore_image;

    let zero_service = headless_service(
        &zero,
        namespace,
        json!([{ "name": "zero-grpc", "port": 5080 }]),
    )?;

    let zero_set = stateful_set(
        &zero,
        namespace,
        REPLICAS,
        &storage,
        json!({
            "affinity": spread_affinity(&zero),
            "containers": [{
                "name": "zero",
                "image": image,
                "command": ["bash", "-c"],
                "args": [format!(
                    "set -ex\ndgraph zero --my=$(hostname -f):5080 \
                     --replicas {REPLICAS} \
                     --idx $(($(hostname | rev | cut -d'-' -f1 | rev) + 1))"
                )],
                "ports": [
                    { "name": "zero-grpc", "containerPort": 5080 },
                    { "name": "zero-http", "containerPort": 6080 }
                ],
                "volumeMounts": [{ "name": "datadir", "mountPath": "/dgraph" }]
            }]
        }),
    )?;

    let alpha_service = headless_service(
        &alpha,
        namespace,
        json!([
            { "name": "alpha-int", "port": 7080 },
            { "name": "alpha-grpc", "port": 9080 }
        ]),
    )?;

    let alpha_set = stateful_set(
        &alpha,
        namespace,
        REPLICAS,
        &storage,
        json!({
            "affinity": spread_affinity(&alpha),
            "containers": [{
                "name": "alpha",
                "image": image,
                "command": ["bash", "-c"],
                "args": [format!(
                    "set -ex\ndgraph alpha --my=$(hostname -f):7080 \
                     --zero {zero}-0.{zero}.{namespace}.svc.cluster.local:5080"
                )],
                "ports": [
                    { "name": "alpha-int", "containerPort": 7080 },
                    { "name": "alpha-http", "containerPort": 8080 },
                    { "name": "alpha-grpc", "containerPort": 9080 }
                ],
                "volumeMounts": [{ "name": "datadir", "mountPath": "/dgraph" }]
            }]
        }),
    )?;

    Ok(vec![
        Descriptor::Service(zero_service),
        Descriptor::StatefulSet(zero_set),
        Descriptor::Service(alpha_service),
        Descriptor::StatefulSet(alpha_set),
    ])
}
