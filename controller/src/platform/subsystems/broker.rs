//! MQTT bridge terminating device TLS connections and forwarding
//! telemetry into Kafka, plus the router consuming that stream back
//! out to per-device topics.

use serde_json::json;

use crate::crds::PlatformSpec;
use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::subsystems::{deployment_service, workload_deployment};
use crate::platform::types::Result;

pub fn descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let name = format!("{instance}-mqtt-bridge");

    let deployment = workload_deployment(
        &name,
        namespace,
        json!({
            "containers": [{
                "name": "mqtt-bridge",
                "image": config.images.platform_image("mqtt-bridge"),
                "env": [{
                    "name": "KAFKA_HOST",
                    "value": spec.kafka.bootstrap_servers
                }],
                "ports": [{ "name": "mqtts", "containerPort": 8883 }],
                "volumeMounts": [{
                    "name": "certificate",
                    "mountPath": "/cert",
                    "readOnly": true
                }]
            }],
            "volumes": [{
                "name": "certificate",
                "secret": { "secretName": spec.broker.secret_name }
            }]
        }),
    )?;

    let service = deployment_service(
        &name,
        namespace,
        json!([{ "name": "mqtts", "port": 8883 }]),
    )?;

    Ok(vec![
        Descriptor::Deployment(deployment),
        Descriptor::Service(service),
    ])
}

pub fn telemetry_descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let name = format!("{instance}-telemetry-router");

    let deployment = workload_deployment(
        &name,
        namespace,
        json!({
            "containers": [{
                "name": "telemetry-router",
                "image": config.images.platform_image("telemetry-router"),
                "env": [{
                    "name": "KAFKA_HOST",
                    "value": spec.kafka.bootstrap_servers
                }]
            }]
        }),
    )?;

    Ok(vec![Descriptor::Deployment(deployment)])
}
