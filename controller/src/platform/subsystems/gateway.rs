//! Public surfaces: gRPC API gateway, REST translation layer, and the
//! frontend application, each with an Ingress built from the spec.

use k8s_openapi::api::core::v1::Secret;
use serde_json::json;

use crate::crds::PlatformSpec;
use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::credentials::generate_password;
use crate::platform::subsystems::{deployment_service, public_ingress, workload_deployment};
use crate::platform::types::Result;

pub fn signing_secret_name(instance: &str) -> String {
    format!("{instance}-gateway-grpc")
}

/// Secret holding the JWT signing key for the gRPC gateway. The value
/// is freshly generated on every call; the apply layer's create-if-absent
/// semantics keep the first persisted key stable.
pub fn signing_key_secret(instance: &str, namespace: &str) -> Result<Secret> {
    let object = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": signing_secret_name(instance),
            "namespace": namespace
        },
        "stringData": { "signing-key": generate_password() }
    });
    Ok(serde_json::from_value(object)?)
}

pub fn descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();

    let grpc_name = format!("{instance}-gateway-grpc");
    let rest_name = format!("{instance}-gateway-rest");
    let app_name = format!("{instance}-app");

    if spec.subsystems.gateway_grpc {
        let deployment = workload_deployment(
            &grpc_name,
            namespace,
            json!({
                "containers": [{
                    "name": "gateway-grpc",
                    "image": config.images.platform_image("gateway-grpc"),
                    "env": [
                        {
                            "name": "DIRECTORY_HOST",
                            "value": format!("{instance}-directory:8080")
                        },
                        {
                            "name": "REGISTRY_HOST",
                            "value": format!("{instance}-registry:8080")
                        },
                        {
                            "name": "SHADOW_HOST",
                            "value": format!("{instance}-shadow-api:8080")
                        },
                        {
                            "name": "SIGNING_KEY",
                            "valueFrom": {
                                "secretKeyRef": {
                                    "name": signing_secret_name(instance),
                                    "key": "signing-key"
                                }
                            }
                        }
                    ],
                    "ports": [{ "name": "grpc", "containerPort": 8080 }]
                }]
            }),
        )?;

        let service = deployment_service(
            &grpc_name,
            namespace,
            json!([{ "name": "grpc", "port": 8080 }]),
        )?;

        let ingress = public_ingress(
            &grpc_name,
            namespace,
            &spec.gateway.grpc.host,
            &spec.gateway.grpc.tls,
            &grpc_name,
            8080,
            json!({ "nginx.ingress.kubernetes.io/backend-protocol": "GRPC" }),
        )?;

        out.push(Descriptor::Deployment(deployment));
        out.push(Descriptor::Service(service));
        out.push(Descriptor::Ingress(ingress));
    }

    if spec.subsystems.gateway_rest {
        let deployment = workload_deployment(
            &rest_name,
            namespace,
            json!({
                "containers": [{
                    "name": "gateway-rest",
                    "image": config.images.platform_image("gateway-rest"),
                    "env": [{
                        "name": "GATEWAY_ENDPOINT",
                        "value": format!("{grpc_name}:8080")
                    }],
                    "ports": [{ "name": "http", "containerPort": 8080 }]
                }]
            }),
        )?;

        let service = deployment_service(
            &rest_name,
            namespace,
            json!([{ "name": "http", "port": 8080 }]),
        )?;

        let ingress = public_ingress(
            &rest_name,
            namespace,
            &spec.gateway.rest.host,
            &spec.gateway.rest.tls,
            &rest_name,
            8080,
            json!({}),
        )?;

        out.push(Descriptor::Deployment(deployment));
        out.push(Descriptor::Service(service));
        out.push(Descriptor::Ingress(ingress));
    }

    if spec.subsystems.app {
        let deployment = workload_deployment(
            &app_name,
            namespace,
            json!({
                "containers": [{
                    "name": "app",
                    "image": config.images.platform_image("app"),
                    "ports": [{ "name": "http", "containerPort": 8080 }]
                }]
            }),
        )?;

        let service = deployment_service(
            &app_name,
            namespace,
            json!([{ "name": "http", "port": 8080 }]),
        )?;

        let ingress = public_ingress(
            &app_name,
            namespace,
            &spec.app.host,
            &spec.app.tls,
            &app_name,
            8080,
            json!({}),
        )?;

        out.push(Descriptor::Deployment(deployment));
        out.push(Descriptor::Service(service));
        out.push(Descriptor::Ingress(ingress));
    }

    Ok(out)
}
