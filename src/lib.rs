use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    Api, Client,
    config::KubeConfigOptions,
    runtime::{Controller, watcher},
};
use tracing::{error, info};

pub mod config;
pub mod converge;
pub mod crds;
pub mod error;
pub mod materialize;
pub mod reconcile;
pub mod remote;
pub mod status;
pub mod store;

use config::Settings;
use crds::*;
use reconcile::{Reconciler, error_policy, reconcile};
use remote::KubeRemoteConnector;
use store::{KubeSecrets, KubeSyncRequests};

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let options = KubeConfigOptions::default();

    // Load kubeconfig if it's present otherwise fall back to cluster config
    let config = kube::Config::from_kubeconfig(&options)
        .await
        .or_else(|_| kube::Config::incluster())?;
    let client = Client::try_from(config)?;

    let reconciler = Reconciler::new(
        Arc::new(KubeSyncRequests::new(client.clone())),
        Arc::new(KubeSecrets::new(client.clone())),
        Arc::new(KubeRemoteConnector::new(settings.remote_timeout())),
    )
    .with_requeue_interval(settings.requeue_interval());

    info!(
        requeue_interval = ?reconciler.requeue_interval,
        "Starting SynchronizedSecret controller"
    );

    // Owned secrets edited out-of-band are put back on the next cycle
    Controller::new(
        Api::<SynchronizedSecret>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(Api::<Secret>::all(client), watcher::Config::default())
    .shutdown_on_signal()
    .run(reconcile, error_policy, Arc::new(reconciler))
    .for_each(|res| async move {
        match res {
            Ok((obj, _)) => info!("SynchronizedSecret '{}' reconciled", obj.name),
            Err(e) => error!("Reconcile error: {}", e),
        }
    })
    .await;

    Ok(())
}
