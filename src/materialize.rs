use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt, api::ObjectMeta};

use crate::crds::SynchronizedSecret;

pub const APP_LABEL: &str = "app";
pub const OWNER_LABEL: &str = "homerow.ca/synchronized-secret";

/// Builds the local mirror of `remote` for `request`.
///
/// Name and namespace come from the request, data is copied untouched from
/// the remote secret. The same inputs always produce the same object.
pub fn desired_secret(request: &SynchronizedSecret, remote: &Secret) -> Secret {
    let name = request.name_any();

    Secret {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: request.namespace(),
            labels: Some(BTreeMap::from([
                (APP_LABEL.to_owned(), name.clone()),
                (OWNER_LABEL.to_owned(), name),
            ])),
            owner_references: request.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        data: remote.data.clone(),
        ..Secret::default()
    }
}
