//! One reconciliation cycle for a SynchronizedSecret.

use std::{sync::Arc, time::Duration};

use kube::{ResourceExt, runtime::controller::Action};
use tracing::{error, info, instrument, warn};

use crate::{
    converge::{Convergence, converge},
    crds::SynchronizedSecret,
    error::{Error, Result, StatusCode},
    materialize::desired_secret,
    remote::{self, RemoteConnector},
    status,
    store::{SecretStore, SyncRequestStore},
};

/// Re-check interval used when nothing else is configured.
pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Capabilities a cycle runs against. Holds no per-request state, so one
/// instance serves concurrent cycles for different SynchronizedSecrets.
pub struct Reconciler {
    pub requests: Arc<dyn SyncRequestStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub remote: Arc<dyn RemoteConnector>,
    pub requeue_interval: Duration,
}

impl Reconciler {
    pub fn new(
        requests: Arc<dyn SyncRequestStore>,
        secrets: Arc<dyn SecretStore>,
        remote: Arc<dyn RemoteConnector>,
    ) -> Self {
        Self {
            requests,
            secrets,
            remote,
            requeue_interval: DEFAULT_REQUEUE_INTERVAL,
        }
    }

    pub fn with_requeue_interval(mut self, interval: Duration) -> Self {
        self.requeue_interval = interval;
        self
    }

    /// Runs one cycle for the SynchronizedSecret `namespace/name`.
    ///
    /// Returns `Action::await_change()` once the object is gone, otherwise a
    /// requeue after the configured interval. Failures that need attention are
    /// returned as errors after their status has been recorded.
    #[instrument(skip(self))]
    pub async fn cycle(&self, namespace: &str, name: &str) -> Result<Action> {
        let request = self
            .requests
            .get(namespace, name)
            .await
            .map_err(|source| Error::ConfigRead {
                namespace: namespace.to_owned(),
                name: name.to_owned(),
                source,
            })?;

        let Some(mut request) = request else {
            info!("SynchronizedSecret no longer exists");
            return Ok(Action::await_change());
        };

        match self.sync(&request).await {
            Ok(outcome) => {
                info!(?outcome, "Local secret in sync");
                self.record(&mut request, StatusCode::InSync).await;
                Ok(Action::requeue(self.requeue_interval))
            }
            Err(err) => {
                if let Some(code) = err.status_code() {
                    self.record(&mut request, code).await;
                }
                if err.is_expected() {
                    info!(reason = %err, "Remote secret not available yet");
                    Ok(Action::requeue(self.requeue_interval))
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn sync(&self, request: &SynchronizedSecret) -> Result<Convergence> {
        let remote_name = request.spec.remote_secret.name.trim();
        if remote_name.is_empty() {
            return Err(Error::InvalidSpec("spec.remoteSecret.name is empty".to_owned()));
        }
        let remote_namespace = request
            .remote_namespace()
            .ok_or_else(|| Error::InvalidSpec("no remote namespace".to_owned()))?;

        let remote = remote::resolve(self.secrets.as_ref(), self.remote.as_ref(), request).await?;
        let snapshot = remote::fetch(remote.as_ref(), remote_namespace, remote_name).await?;
        let desired = desired_secret(request, &snapshot);

        converge(self.secrets.as_ref(), &desired).await
    }

    async fn record(&self, request: &mut SynchronizedSecret, code: StatusCode) {
        if let Err(e) = status::report(self.requests.as_ref(), request, code).await {
            warn!(status = %code, error = %e, "Failed to update SynchronizedSecret status");
        }
    }
}

/// Entry point for `kube::runtime::Controller`.
pub async fn reconcile(obj: Arc<SynchronizedSecret>, ctx: Arc<Reconciler>) -> Result<Action> {
    let namespace = obj.namespace().unwrap_or_default();
    ctx.cycle(&namespace, &obj.name_any()).await
}

/// Every failed cycle is retried on the regular interval.
pub fn error_policy(obj: Arc<SynchronizedSecret>, err: &Error, ctx: Arc<Reconciler>) -> Action {
    error!(
        namespace = %obj.namespace().unwrap_or_default(),
        name = %obj.name_any(),
        error = %err,
        "Reconcile failed"
    );
    Action::requeue(ctx.requeue_interval)
}
