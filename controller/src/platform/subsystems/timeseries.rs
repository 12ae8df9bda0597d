//! Time-series pipeline: Kafka connector plus the database it writes to.

use serde_json::json;

use crate::crds::PlatformSpec;
use crate::platform::compile::Descriptor;
use crate::platform::config::OperatorConfig;
use crate::platform::subsystems::{headless_service, stateful_set, workload_deployment};
use crate::platform::types::Result;

pub fn descriptors(
    instance: &str,
    namespace: &str,
    spec: &PlatformSpec,
    config: &OperatorConfig,
) -> Result<Vec<Descriptor>> {
    let db_name = format!("{instance}-timeseries-db");
    let connector_name = format!("{instance}-timeseries-connector");
    let storage = spec
        .timeseries
        .storage
        .clone()
        .unwrap_or_else(|| config.storage.default_size.clone());

    let connector = workload_deployment(
        &connector_name,
        namespace,
        json!({
            "containers": [{
                "name": "timeseries-connector",
                "image": config.images.platform_image("timeseries-connector"),
                "env": [
                    { "name": "KAFKA_HOST", "value": spec.kafka.bootstrap_servers },
                    { "name": "DB_ADDR", "value": format!("{db_name}:5432") }
                ]
            }]
        }),
    )?;

    let db_service = headless_service(
        &db_name,
        namespace,
        json!([{ "name": "postgres", "port": 5432 }]),
    )?;

    let db = stateful_set(
        &db_name,
        namespace,
        1,
        &storage,
        json!({
            "containers": [{
                "name": "timeseries-db",
                "image": config.images.timeseries_image,
                "env": [
                    { "name": "POSTGRES_HOST_AUTH_METHOD", "value": "trust" },
                    { "name": "PGDATA", "value": "/var/lib/postgresql/data/pgdata" }
                ],
                "ports": [{ "name": "postgres", "containerPort": 5432 }],
                "volumeMounts": [{
                    "name": "datadir",
                    "mountPath": "/var/lib/postgresql/data"
                }]
            }]
        }),
    )?;

    Ok(vec![
        Descriptor::Deployment(connector),
        Descriptor::Service(db_service),
        Descriptor::StatefulSet(db),
    ])
}
