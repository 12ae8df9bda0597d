//! Platform controller: watch loop, per-instance orchestrator, status

pub mod apply;
pub mod client;
pub mod compile;
pub mod config;
pub mod credentials;
pub mod diff;
pub mod subsystems;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::ResourceExt;
use serde_json::json;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::crds::Platform;
use crate::platform::apply::{apply, owner_reference};
use crate::platform::client::{KubeResourceOps, ResourceOps};
use crate::platform::compile::{compile, Descriptor};
use crate::platform::config::OperatorConfig;
use crate::platform::credentials::{sync_root_credential, AccountDirectory, HttpAccountDirectory};
use crate::platform::types::{Context, Error, Result};

/// Run the platform controller until shutdown
pub async fn run_platform_controller(client: kube::Client, config: Arc<OperatorConfig>) {
    let platforms = Api::<Platform>::all(client.clone());
    let context = Arc::new(Context {
        client: client.clone(),
        config,
    });

    info!("starting platform controller");

    Controller::new(platforms, watcher::Config::default().any_semantic())
        .owns(
            Api::<Deployment>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<StatefulSet>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<Service>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<Secret>::all(client.clone()),
            watcher::Config::default(),
        )
        .shutdown_on_signal()
        .run(reconcile_platform, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok(object) => debug!(?object, "reconciled platform"),
                Err(e) => warn!(error = %e, "reconcile failed"),
            }
        })
        .await;

    info!("platform controller stopped");
}

/// Reconcile one platform instance
#[instrument(skip(platform, ctx), fields(instance = %platform.name_any()))]
pub async fn reconcile_platform(platform: Arc<Platform>, ctx: Arc<Context>) -> Result<Action> {
    let instance = platform.name_any();
    let namespace = platform
        .namespace()
        .ok_or_else(|| Error::Validation("platform object has no namespace".into()))?;

    let ops = KubeResourceOps::new(ctx.client.clone());
    let directory =
        HttpAccountDirectory::for_instance(&instance, &namespace, ctx.config.directory.port);

    match converge(&platform, &ctx.config, &ops, &directory).await {
        Ok(()) => {
            publish_status(&ctx.client, &platform, "Converged", None).await;
            Ok(Action::requeue(Duration::from_secs(
                ctx.config.requeue_seconds(),
            )))
        }
        Err(e) => {
            publish_status(&ctx.client, &platform, "Error", Some(e.to_string())).await;
            Err(e)
        }
    }
}

/// One full convergence pass: compile, apply in order, then converge
/// the root credential. Stops at the first error; the next invocation
/// recomputes everything from scratch.
pub async fn converge<C, D>(
    platform: &Platform,
    config: &OperatorConfig,
    ops: &C,
    directory: &D,
) -> Result<()>
where
    C: ResourceOps,
    D: AccountDirectory,
{
    let owner = owner_reference(platform)?;
    let compiled = compile(platform, config)?;

    let instance = platform.name_any();
    let namespace = platform
        .namespace()
        .ok_or_else(|| Error::Validation("platform object has no namespace".into()))?;
    let toggles = &platform.spec.subsystems;

    // The signing key is generated, not compiled, so the first
    // persisted value stays stable across passes.
    if toggles.gateway_grpc {
        let secret = subsystems::gateway::signing_key_secret(&instance, &namespace)?;
        apply(ops, &owner, &Descriptor::Secret(secret))
            .instrument(info_span!("subsystem", subsystem = "gateway", %instance))
            .await?;
    }

    for (subsystem, descriptor) in &compiled {
        apply(ops, &owner, descriptor)
            .instrument(info_span!("subsystem", subsystem = %subsystem, %instance))
            .await?;
    }

    if toggles.credentials && toggles.directory {
        sync_root_credential(ops, directory, &owner, &namespace, &instance)
            .instrument(info_span!("subsystem", subsystem = "credentials", %instance))
            .await?;
    }

    Ok(())
}

/// Best-effort status write; failures are logged, never propagated
async fn publish_status(
    client: &kube::Client,
    platform: &Platform,
    phase: &str,
    message: Option<String>,
) {
    let Some(namespace) = platform.namespace() else {
        return;
    };
    let name = platform.name_any();

    let api = Api::<Platform>::namespaced(client.clone(), &namespace);
    let status = Patch::Merge(json!({
        "status": {
            "phase": phase,
            "message": message,
            "observedGeneration": platform.metadata.generation
        }
    }));

    if let Err(e) = api
        .patch_status(&name, &PatchParams::default(), &status)
        .await
    {
        warn!(instance = %name, error = %e, "failed to publish status");
    }
}

fn error_policy(platform: Arc<Platform>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(instance = %platform.name_any(), %error, "reconciliation error, requeueing");
    Action::requeue(Duration::from_secs(30))
}
