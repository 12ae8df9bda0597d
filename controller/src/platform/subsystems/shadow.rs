//! Device-shadow pipeline: delta merger and persister consumers, the
//! shadow query API, and the cache StatefulSet they share.

use serde_json::{json, Value};

use crate::crds::PlatformSpec;
use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::subsystems::{
    deployment_service, headless_service, stateful_set, workload_deployment,
};
use crate::platform::types::Result;

pub fn descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let cache_name = format!("{instance}-shadow-cache");
    let cache_host = format!("{cache_name}:6379");
    let kafka_host = &spec.kafka.bootstrap_servers;

    let consumer_env = |extra: Value| -> Value {
        json!([
            { "name": "KAFKA_HOST", "value": kafka_host },
            { "name": "CACHE_HOST", "value": cache_host },
            extra
        ])
    };

    let delta_merger = format!("{instance}-shadow-delta-merger");
    let merger = workload_deployment(
        &delta_merger,
        namespace,
        json!({
            "containers": [{
                "name": "shadow-delta-merger",
                "image": config.images.platform_image("shadow-delta-merger"),
                "env": consumer_env(json!(
                    { "name": "CONSUMER_GROUP", "value": delta_merger }
                ))
            }]
        }),
    )?;

    let persister_name = format!("{instance}-shadow-persister");
    let persister = workload_deployment(
        &persister_name,
        namespace,
        json!({
            "containers": [{
                "name": "shadow-persister",
                "image": config.images.platform_image("shadow-persister"),
                "env": consumer_env(json!(
                    { "name": "CONSUMER_GROUP", "value": persister_name }
                ))
            }]
        }),
    )?;

    let api_name = format!("{instance}-shadow-api");
    let api = workload_deployment(
        &api_name,
        namespace,
        json!({
            "containers": [{
                "name": "shadow-api",
                "image": config.images.platform_image("shadow-api"),
                "env": [
                    { "name": "KAFKA_HOST", "value": kafka_host },
                    { "name": "CACHE_HOST", "value": cache_host }
                ],
                "ports": [{ "name": "grpc", "containerPort": 8080 }]
            }]
        }),
    )?;

    let api_service = deployment_service(
        &api_name,
        namespace,
        json!([{ "name": "grpc", "port": 8080 }]),
    )?;

    let cache_service = headless_service(
        &cache_name,
        namespace,
        json!([{ "name": "redis", "port": 6379 }]),
    )?;

    let cache = stateful_set(
        &cache_name,
        namespace,
        1,
        &config.storage.default_size,
        json!({
            "containers": [{
                "name": "cache",
                "image": config.images.cache_image,
                "args": ["--appendonly", "yes"],
                "ports": [{ "name": "redis", "containerPort": 6379 }],
                "volumeMounts": [{ "name": "datadir", "mountPath": "/data" }]
            }]
        }),
    )?;

    Ok(vec![
        Descriptor::Deployment(merger),
        Descriptor::Deployment(persister),
        Descriptor::Deployment(api),
        Descriptor::Service(api_service),
        Descriptor::Service(cache_service),
        Descriptor::StatefulSet(cache),
    ])
}
