//! In-memory stand-ins for the cluster-facing stores.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::{ResourceExt, api::ObjectMeta, core::ErrorResponse};
use remote_secret_sync::{
    crds::{RemoteSecretRef, SynchronizedSecret, SynchronizedSecretSpec, SynchronizedSecretStatus},
    error::{Error, Result},
    reconcile::Reconciler,
    remote::{CREDENTIALS_SECRET_NAME, RemoteConnector, RemoteCredentials, RemoteSecretReader},
    store::{SecretStore, SyncRequestStore},
};

pub const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
pub const INTERVAL: Duration = Duration::from_secs(600);

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_owned(), name.to_owned())
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: format!("{reason} (injected)"),
        reason: reason.to_owned(),
        code,
    })
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_owned(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Secret::default()
    }
}

pub fn credentials(namespace: &str) -> Secret {
    secret(
        namespace,
        CREDENTIALS_SECRET_NAME,
        &[
            ("host", "https://remote.example:6443"),
            ("token", "remote-token"),
            ("ca", CA_PEM),
        ],
    )
}

pub fn sync_request(namespace: &str, name: &str, remote: &str, remote_ns: &str) -> SynchronizedSecret {
    let mut request = SynchronizedSecret::new(
        name,
        SynchronizedSecretSpec {
            remote_secret: RemoteSecretRef {
                name: remote.to_owned(),
                namespace: Some(remote_ns.to_owned()),
            },
        },
    );
    request.metadata.namespace = Some(namespace.to_owned());
    request.metadata.uid = Some(format!("uid-{namespace}-{name}"));
    request
}

#[derive(Default)]
struct RequestState {
    objects: BTreeMap<Key, SynchronizedSecret>,
    status_writes: usize,
    fail_reads: bool,
}

#[derive(Clone, Default)]
pub struct FakeRequests {
    state: Arc<Mutex<RequestState>>,
}

impl FakeRequests {
    pub fn insert(&self, request: SynchronizedSecret) {
        let k = key(&request.namespace().unwrap_or_default(), &request.name_any());
        self.state.lock().unwrap().objects.insert(k, request);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.state.lock().unwrap().objects.remove(&key(namespace, name));
    }

    pub fn status(&self, namespace: &str, name: &str) -> Option<SynchronizedSecretStatus> {
        let state = self.state.lock().unwrap();
        state.objects.get(&key(namespace, name)).and_then(|r| r.status.clone())
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }
}

#[async_trait]
impl SyncRequestStore for FakeRequests {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<Option<SynchronizedSecret>, kube::Error> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(api_error(500, "InternalError"));
        }
        Ok(state.objects.get(&key(namespace, name)).cloned())
    }

    async fn patch_status(
        &self,
        request: &SynchronizedSecret,
        status: &SynchronizedSecretStatus,
    ) -> std::result::Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        let k = key(&request.namespace().unwrap_or_default(), &request.name_any());
        let stored = state
            .objects
            .get_mut(&k)
            .ok_or_else(|| api_error(404, "NotFound"))?;
        stored.status = Some(status.clone());
        state.status_writes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct SecretState {
    objects: BTreeMap<Key, Secret>,
    creates: usize,
    replaces: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// Secret store used for the local cluster and as the remote cluster's contents.
#[derive(Clone, Default)]
pub struct FakeSecrets {
    state: Arc<Mutex<SecretState>>,
}

impl FakeSecrets {
    pub fn insert(&self, secret: Secret) {
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        self.state.lock().unwrap().objects.insert(k, secret);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.state.lock().unwrap().objects.remove(&key(namespace, name));
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state.lock().unwrap().objects.get(&key(namespace, name)).cloned()
    }

    /// Data of a stored secret as UTF-8 strings.
    pub fn data(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.secret(namespace, name).map(|s| {
            s.data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, ByteString(v))| (k, String::from_utf8(v).unwrap()))
                .collect()
        })
    }

    pub fn writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.creates + state.replaces
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn replaces(&self) -> usize {
        self.state.lock().unwrap().replaces
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    fn read(&self, namespace: &str, name: &str) -> std::result::Result<Option<Secret>, kube::Error> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(api_error(503, "ServiceUnavailable"));
        }
        Ok(state.objects.get(&key(namespace, name)).cloned())
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn get(&self, namespace: &str, name: &str) -> std::result::Result<Option<Secret>, kube::Error> {
        self.read(namespace, name)
    }

    async fn create(&self, secret: &Secret) -> std::result::Result<Secret, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(api_error(403, "Forbidden"));
        }
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if state.objects.contains_key(&k) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.objects.insert(k, secret.clone());
        state.creates += 1;
        Ok(secret.clone())
    }

    async fn replace(&self, secret: &Secret) -> std::result::Result<Secret, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(api_error(403, "Forbidden"));
        }
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if !state.objects.contains_key(&k) {
            return Err(api_error(404, "NotFound"));
        }
        state.objects.insert(k, secret.clone());
        state.replaces += 1;
        Ok(secret.clone())
    }
}

#[async_trait]
impl RemoteSecretReader for FakeSecrets {
    async fn get(&self, namespace: &str, name: &str) -> std::result::Result<Option<Secret>, kube::Error> {
        self.read(namespace, name)
    }
}

/// Hands out the fake remote cluster, remembering the credentials it was given.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub remote: FakeSecrets,
    seen: Arc<Mutex<Vec<RemoteCredentials>>>,
    refuse: Arc<Mutex<bool>>,
}

impl FakeConnector {
    pub fn seen(&self) -> Vec<RemoteCredentials> {
        self.seen.lock().unwrap().clone()
    }

    pub fn refuse(&self) {
        *self.refuse.lock().unwrap() = true;
    }
}

#[async_trait]
impl RemoteConnector for FakeConnector {
    async fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn RemoteSecretReader>> {
        self.seen.lock().unwrap().push(credentials.clone());
        if *self.refuse.lock().unwrap() {
            return Err(Error::remote_connect("connection refused"));
        }
        Ok(Box::new(self.remote.clone()))
    }
}

/// A reconciler wired to fresh fakes.
pub struct Harness {
    pub requests: FakeRequests,
    pub local: FakeSecrets,
    pub connector: FakeConnector,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let requests = FakeRequests::default();
        let local = FakeSecrets::default();
        let connector = FakeConnector::default();
        let reconciler = Reconciler::new(
            Arc::new(requests.clone()),
            Arc::new(local.clone()),
            Arc::new(connector.clone()),
        )
        .with_requeue_interval(INTERVAL);

        Self {
            requests,
            local,
            connector,
            reconciler,
        }
    }

    pub fn remote(&self) -> &FakeSecrets {
        &self.connector.remote
    }
}
