use chrono::{SecondsFormat, Utc};
use kube::ResourceExt;
use tracing::debug;

use crate::{
    crds::{SynchronizedSecret, SynchronizedSecretStatus},
    error::StatusCode,
    store::SyncRequestStore,
};

/// Status to write for `code`, or `None` when the stored status already matches.
///
/// Skipping identical writes keeps the watch on SynchronizedSecret from
/// re-triggering a reconcile after every cycle.
pub fn next_status(
    request: &SynchronizedSecret,
    code: StatusCode,
    now: &str,
) -> Option<SynchronizedSecretStatus> {
    if request.current_status() == Some(code.as_str()) {
        return None;
    }

    Some(SynchronizedSecretStatus {
        status: code.as_str().to_owned(),
        last_sync_timestamp: now.to_owned(),
    })
}

/// RFC3339 timestamp in UTC with second precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Records `code` on `request`, returning whether a write happened.
pub async fn report(
    store: &dyn SyncRequestStore,
    request: &mut SynchronizedSecret,
    code: StatusCode,
) -> Result<bool, kube::Error> {
    let Some(status) = next_status(request, code, &timestamp()) else {
        debug!(name = %request.name_any(), status = %code, "Status unchanged");
        return Ok(false);
    };

    store.patch_status(request, &status).await?;
    request.status = Some(status);
    Ok(true)
}
