//! Capability seams over the local cluster.
//!
//! The reconciler only talks to Kubernetes through these traits so the
//! convergence and status logic can be driven by in-memory stores in tests.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    Api, Client, ResourceExt,
    api::{Patch, PatchParams, PostParams},
};

use crate::crds::{SynchronizedSecret, SynchronizedSecretStatus};

pub const FIELD_MANAGER: &str = "synchronizedsecret.homerow.ca";

/// Read and status-write access to SynchronizedSecret objects.
#[async_trait]
pub trait SyncRequestStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str)
    -> Result<Option<SynchronizedSecret>, kube::Error>;

    async fn patch_status(
        &self,
        request: &SynchronizedSecret,
        status: &SynchronizedSecretStatus,
    ) -> Result<(), kube::Error>;
}

/// Secrets on the local cluster.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error>;

    async fn create(&self, secret: &Secret) -> Result<Secret, kube::Error>;

    /// Full update of an existing secret.
    async fn replace(&self, secret: &Secret) -> Result<Secret, kube::Error>;
}

#[derive(Clone)]
pub struct KubeSyncRequests {
    client: Client,
}

impl KubeSyncRequests {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SyncRequestStore for KubeSyncRequests {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SynchronizedSecret>, kube::Error> {
        Api::<SynchronizedSecret>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn patch_status(
        &self,
        request: &SynchronizedSecret,
        status: &SynchronizedSecretStatus,
    ) -> Result<(), kube::Error> {
        let namespace = request.namespace().unwrap_or_default();
        let patch = serde_json::json!({ "status": status });

        Api::<SynchronizedSecret>::namespaced(self.client.clone(), &namespace)
            .patch_status(
                &request.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;

        Ok(())
    }
}

/// `kube::Api` backed secrets; serves both the local store and remote reads.
#[derive(Clone)]
pub struct KubeSecrets {
    client: Client,
}

impl KubeSecrets {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_owned()),
        ..PostParams::default()
    }
}

#[async_trait]
impl SecretStore for KubeSecrets {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        self.api(namespace).get_opt(name).await
    }

    async fn create(&self, secret: &Secret) -> Result<Secret, kube::Error> {
        let namespace = secret.namespace().unwrap_or_default();
        self.api(&namespace).create(&post_params(), secret).await
    }

    async fn replace(&self, secret: &Secret) -> Result<Secret, kube::Error> {
        let namespace = secret.namespace().unwrap_or_default();
        self.api(&namespace)
            .replace(&secret.name_any(), &post_params(), secret)
            .await
    }
}
