//! Generic convergence primitive applied to every compiled descriptor

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::crds::Platform;
use crate::platform::client::{ClusterObject, CreateOutcome, ResourceOps};
use crate::platform::compile::Descriptor;
use crate::platform::diff::MutableSubset;
use crate::platform::types::{Error, Result};

/// What a single apply pass did to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The object did not exist and was created
    Created,
    /// The object matched the desired state (or lost a benign create race)
    Unchanged,
    /// The object drifted on a mutable field and was corrected
    Updated,
    /// The object exists but its kind has no in-place update path
    LeftInPlace,
}

/// Owner reference pointing at the platform instance, so deleting the
/// instance cascades to everything the controller created.
pub fn owner_reference(platform: &Platform) -> Result<OwnerReference> {
    let uid = platform
        .uid()
        .ok_or_else(|| Error::Validation("platform object has no uid".into()))?;
    Ok(OwnerReference {
        api_version: Platform::api_version(&()).to_string(),
        kind: Platform::kind(&()).to_string(),
        name: platform.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn bind_owner<K: ClusterObject>(object: &mut K, owner: &OwnerReference) {
    object.meta_mut().owner_references = Some(vec![owner.clone()]);
}

/// Converge one compiled descriptor onto the cluster
pub async fn apply<C: ResourceOps>(
    ops: &C,
    owner: &OwnerReference,
    descriptor: &Descriptor,
) -> Result<Applied> {
    match descriptor {
        Descriptor::Deployment(d) => converge_mutable(ops, owner, d).await,
        Descriptor::StatefulSet(s) => converge_mutable(ops, owner, s).await,
        Descriptor::CronJob(c) => converge_mutable(ops, owner, c).await,
        Descriptor::Service(s) => converge_immutable(ops, owner, s).await,
        Descriptor::Ingress(i) => converge_immutable(ops, owner, i).await,
        Descriptor::Secret(s) => converge_immutable(ops, owner, s).await,
        Descriptor::ServiceAccount(s) => converge_immutable(ops, owner, s).await,
        Descriptor::Role(r) => converge_immutable(ops, owner, r).await,
        Descriptor::RoleBinding(r) => converge_immutable(ops, owner, r).await,
    }
}

/// Kinds with a well-defined mutable subset: create when absent,
/// correct the subset when drifted.
async fn converge_mutable<C, K>(ops: &C, owner: &OwnerReference, desired: &K) -> Result<Applied>
where
    C: ResourceOps,
    K: ClusterObject + MutableSubset,
{
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    match ops.get::<K>(&namespace, &name).await? {
        None => create_with_owner(ops, owner, desired).await,
        Some(observed) => {
            if K::drifted(desired, &observed) {
                info!(kind = %kind_of(desired), %name, "correcting drifted object");
                let mut corrected = observed;
                K::overwrite(desired, &mut corrected);
                ops.update(&corrected).await?;
                Ok(Applied::Updated)
            } else {
                debug!(kind = %kind_of(desired), %name, "object up to date");
                Ok(Applied::Unchanged)
            }
        }
    }
}

/// Kinds converged by existence only. An existing object is never
/// rewritten; drift on these kinds is resolved by deleting the object
/// and letting the next pass recreate it.
async fn converge_immutable<C, K>(ops: &C, owner: &OwnerReference, desired: &K) -> Result<Applied>
where
    C: ResourceOps,
    K: ClusterObject,
{
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    match ops.get::<K>(&namespace, &name).await? {
        None => create_with_owner(ops, owner, desired).await,
        Some(_) => {
            debug!(kind = %kind_of(desired), %name, "object exists, leaving in place");
            Ok(Applied::LeftInPlace)
        }
    }
}

async fn create_with_owner<C, K>(ops: &C, owner: &OwnerReference, desired: &K) -> Result<Applied>
where
    C: ResourceOps,
    K: ClusterObject,
{
    let mut object = desired.clone();
    bind_owner(&mut object, owner);
    match ops.create(&object).await? {
        CreateOutcome::Created => {
            info!(kind = %kind_of(desired), name = %desired.name_any(), "created object");
            Ok(Applied::Created)
        }
        CreateOutcome::AlreadyExists => {
            warn!(kind = %kind_of(desired), name = %desired.name_any(),
                "lost create race, treating as converged");
            Ok(Applied::Unchanged)
        }
    }
}

fn kind_of<K: ClusterObject>(_: &K) -> String {
    K::kind(&()).to_string()
}
