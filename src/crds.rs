use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coordinates of the source secret on the remote cluster.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct RemoteSecretRef {
    #[schemars(length(min = 1))]
    pub name: String,
    /// Defaults to the namespace of the owning SynchronizedSecret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "homerow.ca",
    version = "v1",
    kind = "SynchronizedSecret",
    namespaced,
    status = "SynchronizedSecretStatus",
    shortname = "syncedsecret",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"Last Sync","type":"string","jsonPath":".status.lastSyncTimestamp"}"#
)]
pub struct SynchronizedSecretSpec {
    pub remote_secret: RemoteSecretRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizedSecretStatus {
    pub status: String,
    pub last_sync_timestamp: String,
}

impl SynchronizedSecret {
    /// Namespace the remote secret is read from.
    pub fn remote_namespace(&self) -> Option<&str> {
        self.spec
            .remote_secret
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(self.metadata.namespace.as_deref())
    }

    /// Status code currently stored on the object, if any.
    pub fn current_status(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.status.as_str())
    }
}
