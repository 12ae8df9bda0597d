//! Desired-state compiler: a `Platform` spec plus operator config in,
//! an ordered list of child-resource descriptors out. Pure and
//! deterministic; the only failure mode is spec validation.

use std::fmt;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::ResourceExt;

use crate::crds::{Platform, PlatformSpec};
use crate::platform::config::OperatorConfig;
use crate::platform::subsystems;
use crate::platform::types::{Error, Result};

/// One desired child object, tagged with its concrete kind
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    Service(Service),
    Ingress(Ingress),
    Secret(Secret),
    CronJob(CronJob),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
}

impl Descriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deployment(_) => "Deployment",
            Self::StatefulSet(_) => "StatefulSet",
            Self::Service(_) => "Service",
            Self::Ingress(_) => "Ingress",
            Self::Secret(_) => "Secret",
            Self::CronJob(_) => "CronJob",
            Self::ServiceAccount(_) => "ServiceAccount",
            Self::Role(_) => "Role",
            Self::RoleBinding(_) => "RoleBinding",
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Deployment(o) => o.name_any(),
            Self::StatefulSet(o) => o.name_any(),
            Self::Service(o) => o.name_any(),
            Self::Ingress(o) => o.name_any(),
            Self::Secret(o) => o.name_any(),
            Self::CronJob(o) => o.name_any(),
            Self::ServiceAccount(o) => o.name_any(),
            Self::Role(o) => o.name_any(),
            Self::RoleBinding(o) => o.name_any(),
        }
    }
}

/// Subsystem families, converged in the order listed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Datastore,
    Broker,
    Directory,
    Gateway,
    Telemetry,
    Shadow,
    Timeseries,
    Maintenance,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Datastore => "datastore",
            Self::Broker => "broker",
            Self::Directory => "directory",
            Self::Gateway => "gateway",
            Self::Telemetry => "telemetry",
            Self::Shadow => "shadow",
            Self::Timeseries => "timeseries",
            Self::Maintenance => "maintenance",
        };
        f.write_str(name)
    }
}

/// Convergence order. Later families reference earlier ones by service
/// DNS name only, so this is a naming dependency, not a readiness one.
pub const SUBSYSTEM_ORDER: [Subsystem; 8] = [
    Subsystem::Datastore,
    Subsystem::Broker,
    Subsystem::Directory,
    Subsystem::Gateway,
    Subsystem::Telemetry,
    Subsystem::Shadow,
    Subsystem::Timeseries,
    Subsystem::Maintenance,
];

/// Compile the full desired state for one platform instance
pub fn compile(
    platform: &Platform,
    config: &OperatorConfig,
) -> Result<Vec<(Subsystem, Descriptor)>> {
    validate(&platform.spec)?;

    let instance = platform.name_any();
    let namespace = platform
        .namespace()
        .ok_or_else(|| Error::Validation("platform object has no namespace".into()))?;

    let spec = &platform.spec;
    let toggles = &spec.subsystems;
    let mut out = Vec::new();

    for subsystem in SUBSYSTEM_ORDER {
        let descriptors = match subsystem {
            Subsystem::Datastore if toggles.datastore => {
                subsystems::datastore::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Broker if toggles.broker => {
                subsystems::broker::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Directory if toggles.directory || toggles.registry => {
                subsystems::directory::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Gateway
                if toggles.gateway_grpc || toggles.gateway_rest || toggles.app =>
            {
                subsystems::gateway::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Telemetry if toggles.telemetry => {
                subsystems::broker::telemetry_descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Shadow if toggles.shadow => {
                subsystems::shadow::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Timeseries if toggles.timeseries => {
                subsystems::timeseries::descriptors(&instance, &namespace, spec, config)?
            }
            Subsystem::Maintenance if toggles.maintenance_jobs => {
                subsystems::maintenance::descriptors(&instance, &namespace, config)?
            }
            _ => Vec::new(),
        };

        out.extend(descriptors.into_iter().map(|d| (subsystem, d)));
    }

    Ok(out)
}

/// Reject specs that would compile into broken workloads
fn validate(spec: &PlatformSpec) -> Result<()> {
    let toggles = &spec.subsystems;

    if toggles.broker && spec.broker.secret_name.is_empty() {
        return Err(Error::Validation(
            "broker.secretName is required when the broker bridge is enabled".into(),
        ));
    }

    let needs_kafka =
        toggles.broker || toggles.telemetry || toggles.shadow || toggles.timeseries;
    if needs_kafka && spec.kafka.bootstrap_servers.is_empty() {
        return Err(Error::Validation(
            "kafka.bootstrapServers is required when any consumer subsystem is enabled".into(),
        ));
    }

    if toggles.gateway_grpc && spec.gateway.grpc.host.is_empty() {
        return Err(Error::Validation(
            "gateway.grpc.host is required when the gRPC gateway is enabled".into(),
        ));
    }
    if toggles.gateway_rest && spec.gateway.rest.host.is_empty() {
        return Err(Error::Validation(
            "gateway.rest.host is required when the REST gateway is enabled".into(),
        ));
    }
    if toggles.app && spec.app.host.is_empty() {
        return Err(Error::Validation(
            "app.host is required when the frontend app is enabled".into(),
        ));
    }

    Ok(())
}
