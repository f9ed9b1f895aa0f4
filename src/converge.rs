use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    store::SecretStore,
};

/// What a convergence pass did to the local secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    Created,
    Updated,
    UpToDate,
}

/// Makes the local secret match `desired`: create when absent, full update
/// when the data mapping or the controller differs, otherwise leave it alone.
pub async fn converge(secrets: &dyn SecretStore, desired: &Secret) -> Result<Convergence> {
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();
    let failed = |action: &'static str| {
        let (namespace, name) = (namespace.clone(), name.clone());
        move |source: kube::Error| Error::Convergence {
            action,
            namespace,
            name,
            source,
        }
    };

    let Some(found) = secrets.get(&namespace, &name).await.map_err(failed("read"))? else {
        info!(secret.namespace = %namespace, secret.name = %name, "Creating local secret");
        secrets.create(desired).await.map_err(failed("create"))?;
        return Ok(Convergence::Created);
    };

    check_controller(&found, desired)?;

    if same_data(&found, desired) && controller(&found) == controller(desired) {
        debug!(secret.namespace = %namespace, secret.name = %name, "Local secret already up to date");
        return Ok(Convergence::UpToDate);
    }

    info!(secret.namespace = %namespace, secret.name = %name, "Updating local secret");
    secrets.replace(desired).await.map_err(failed("update"))?;
    Ok(Convergence::Updated)
}

/// Whole-mapping comparison, so keys dropped remotely count as a difference.
fn same_data(found: &Secret, desired: &Secret) -> bool {
    let empty = BTreeMap::new();
    found.data.as_ref().unwrap_or(&empty) == desired.data.as_ref().unwrap_or(&empty)
}

/// Uid and `Kind/name` of the controlling owner reference.
fn controller(secret: &Secret) -> Option<(String, String)> {
    secret
        .owner_references()
        .iter()
        .find(|r| r.controller == Some(true))
        .map(|r| (r.uid.clone(), format!("{}/{}", r.kind, r.name)))
}

/// A secret controlled by some other object is never taken over.
fn check_controller(found: &Secret, desired: &Secret) -> Result<()> {
    match (controller(found), controller(desired)) {
        (Some((found_uid, owner)), Some((desired_uid, _))) if found_uid != desired_uid => {
            Err(Error::OwnershipConflict {
                namespace: found.namespace().unwrap_or_default(),
                name: found.name_any(),
                owner,
            })
        }
        _ => Ok(()),
    }
}
