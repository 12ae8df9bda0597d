//! `Platform` Custom Resource Definition for a full IoT stack instance

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default function for subsystem enable flags
fn default_enabled() -> bool {
    true
}

/// TLS termination for a public ingress route
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TlsConfig {
    /// Hostnames covered by the certificate
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Name of the secret holding the certificate
    #[serde(default, rename = "secretName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// A publicly exposed endpoint (hostname plus TLS references)
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct EndpointExposure {
    /// Public hostname routed to the backing service
    #[serde(default)]
    pub host: String,

    /// TLS configuration for the ingress route
    #[serde(default)]
    pub tls: Vec<TlsConfig>,
}

/// Message-broker bridge configuration
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct BrokerConfig {
    /// Secret holding the broker's TLS certificate, mounted by the bridge
    #[serde(default, rename = "secretName")]
    pub secret_name: String,
}

/// External Kafka connection
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct KafkaConfig {
    /// Bootstrap address handed to every Kafka consumer workload
    #[serde(default, rename = "bootstrapServers")]
    pub bootstrap_servers: String,
}

/// Graph datastore cluster configuration
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatastoreConfig {
    /// Storage quota for each datastore volume claim (e.g. "50Gi").
    /// Falls back to the operator default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

/// Time-series pipeline configuration
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TimeseriesConfig {
    /// Storage quota for the time-series store volume claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

/// Public API gateway exposure (gRPC and REST surfaces)
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct GatewayConfig {
    #[serde(default)]
    pub grpc: EndpointExposure,

    #[serde(default)]
    pub rest: EndpointExposure,
}

/// Per-subsystem enable flags. Everything is on by default; operators
/// switch individual families off for partial deployments.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct SubsystemToggles {
    #[serde(default = "default_enabled")]
    pub datastore: bool,

    #[serde(default = "default_enabled")]
    pub broker: bool,

    #[serde(default = "default_enabled")]
    pub directory: bool,

    #[serde(default = "default_enabled")]
    pub registry: bool,

    #[serde(default = "default_enabled", rename = "gatewayGrpc")]
    pub gateway_grpc: bool,

    #[serde(default = "default_enabled", rename = "gatewayRest")]
    pub gateway_rest: bool,

    #[serde(default = "default_enabled")]
    pub app: bool,

    #[serde(default = "default_enabled")]
    pub telemetry: bool,

    #[serde(default = "default_enabled")]
    pub shadow: bool,

    #[serde(default = "default_enabled")]
    pub timeseries: bool,

    #[serde(default = "default_enabled", rename = "maintenanceJobs")]
    pub maintenance_jobs: bool,

    #[serde(default = "default_enabled")]
    pub credentials: bool,
}

impl Default for SubsystemToggles {
    fn default() -> Self {
        Self {
            datastore: true,
            broker: true,
            directory: true,
            registry: true,
            gateway_grpc: true,
            gateway_rest: true,
            app: true,
            telemetry: true,
            shadow: true,
            timeseries: true,
            maintenance_jobs: true,
            credentials: true,
        }
    }
}

/// `Platform` CRD describing one deployable stack instance
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "iotmesh.dev", version = "v1beta1", kind = "Platform")]
#[kube(namespaced)]
#[kube(status = "PlatformStatus")]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
pub struct PlatformSpec {
    /// Message-broker bridge settings
    #[serde(default)]
    pub broker: BrokerConfig,

    /// External Kafka connection shared by all consumer workloads
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Graph datastore cluster settings
    #[serde(default)]
    pub datastore: DatastoreConfig,

    /// Time-series pipeline settings
    #[serde(default)]
    pub timeseries: TimeseriesConfig,

    /// Public API gateway exposure
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Public frontend application exposure
    #[serde(default)]
    pub app: EndpointExposure,

    /// Per-subsystem enable flags
    #[serde(default)]
    pub subsystems: SubsystemToggles,
}

/// Observed state of a `Platform` instance, written best-effort after
/// each reconciliation pass.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct PlatformStatus {
    /// "Converged" after a clean pass, "Error" after a failed one
    pub phase: String,

    /// Human-readable detail for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Generation of the spec the last pass observed
    #[serde(
        default,
        rename = "observedGeneration",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_generation: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_enables_every_subsystem() {
        let spec: PlatformSpec = serde_json::from_str("{}").unwrap();
        let toggles = &spec.subsystems;

        assert!(toggles.datastore);
        assert!(toggles.broker);
        assert!(toggles.directory);
        assert!(toggles.registry);
        assert!(toggles.gateway_grpc);
        assert!(toggles.gateway_rest);
        assert!(toggles.app);
        assert!(toggles.telemetry);
        assert!(toggles.shadow);
        assert!(toggles.timeseries);
        assert!(toggles.maintenance_jobs);
        assert!(toggles.credentials);
    }

    #[test]
    fn unset_storage_stays_none() {
        let spec: PlatformSpec = serde_json::from_str(r#"{"datastore":{}}"#).unwrap();
        assert_eq!(spec.datastore.storage, None);

        let spec: PlatformSpec =
            serde_json::from_str(r#"{"datastore":{"storage":"50Gi"}}"#).unwrap();
        assert_eq!(spec.datastore.storage.as_deref(), Some("50Gi"));
    }

    #[test]
    fn toggles_deserialize_individually() {
        let spec: PlatformSpec =
            serde_json::from_str(r#"{"subsystems":{"timeseries":false,"gatewayRest":false}}"#)
                .unwrap();
        assert!(!spec.subsystems.timeseries);
        assert!(!spec.subsystems.gateway_rest);
        assert!(spec.subsystems.datastore);
    }
}
