//! Account directory and device registry services, both backed by the
//! graph datastore.

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
    let graph_host = format!("{instance}-graph-alpha:9080");
    let mut out = Vec::new();

    if spec.subsystems.directory {
        out.extend(graph_backed_service(
            &format!("{instance}-directory"),
            "directory",
            namespace,
            &graph_host,
            config,
        )?);
    }

    if spec.subsystems.registry {
        out.extend(graph_backed_service(
            &format!("{instance}-registry"),
            "registry",
            namespace,
            &graph_host,
            config,
        )?);
    }

    Ok(out)
}

fn graph_backed_service(
    name: &str,
    component: &str,
    namespace: &str,
    graph_host: &str,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let deployment = workload_deployment(
        name,
        namespace,
        json!({
            "containers": [{
                "name": component,
                "image": config.images.platform_image(component),
                "env": [{ "name": "GRAPH_HOST", "value": graph_host }],
                "ports": [{ "name": "grpc", "containerPort": 8080 }]
            }]
        }),
    )?;

    let service =
        deployment_service(name, namespace, json!([{ "name": "grpc", "port": 8080 }]))?;

    Ok(vec![
        Descriptor::Deployment(deployment),
        Descriptor::Service(service),
    ])
}
