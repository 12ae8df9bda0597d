//! Custom Resource Definitions

pub mod platform;

pub use platform::{
    BrokerConfig, DatastoreConfig, EndpointExposure, GatewayConfig, KafkaConfig, Platform,
    PlatformSpec, PlatformStatus, SubsystemToggles, TimeseriesConfig, TlsConfig,
};
