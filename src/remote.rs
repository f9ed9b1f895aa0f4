//! Access to the remote cluster: credential resolution and secret reads.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::{
    Client,
    config::{KubeConfigOptions, Kubeconfig},
};
use tracing::debug;

use crate::{
    crds::SynchronizedSecret,
    error::{Error, Result},
    store::{KubeSecrets, SecretStore},
};

/// Local secret holding the remote cluster's connection details.
pub const CREDENTIALS_SECRET_NAME: &str = "secret-sync-remote-cluster-creds";

const REMOTE_CONTEXT: &str = "remote";

/// Connection details read from [`CREDENTIALS_SECRET_NAME`].
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub host: String,
    pub token: String,
    pub ca: Vec<u8>,
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("ca", &format_args!("{} bytes", self.ca.len()))
            .finish()
    }
}

impl RemoteCredentials {
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        Ok(Self {
            host: credential_text(secret, "host")?,
            token: credential_text(secret, "token")?,
            ca: credential_bytes(secret, "ca")?.to_vec(),
        })
    }

    /// Single-context kubeconfig pointing at the remote API server.
    fn kubeconfig(&self) -> Result<Kubeconfig> {
        let value = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": [{
                "name": REMOTE_CONTEXT,
                "cluster": {
                    "server": self.host,
                    "certificate-authority-data": STANDARD.encode(&self.ca),
                },
            }],
            "users": [{
                "name": REMOTE_CONTEXT,
                "user": { "token": self.token },
            }],
            "contexts": [{
                "name": REMOTE_CONTEXT,
                "context": { "cluster": REMOTE_CONTEXT, "user": REMOTE_CONTEXT },
            }],
            "current-context": REMOTE_CONTEXT,
        });

        serde_json::from_value(value)
            .map_err(|e| Error::remote_connect(format!("invalid credentials: {e}")))
    }
}

fn credential_bytes<'a>(secret: &'a Secret, key: &str) -> Result<&'a [u8]> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|ByteString(bytes)| bytes.as_slice())
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| Error::remote_connect(format!("credentials missing '{key}'")))
}

fn credential_text(secret: &Secret, key: &str) -> Result<String> {
    let value = std::str::from_utf8(credential_bytes(secret, key)?)
        .map_err(|_| Error::remote_connect(format!("credentials '{key}' is not UTF-8")))?;
    Ok(value.trim().to_owned())
}

/// Read-only view of secrets on the remote cluster.
#[async_trait]
pub trait RemoteSecretReader: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error>;
}

/// Builds remote readers from credentials.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn RemoteSecretReader>>;
}

#[async_trait]
impl RemoteSecretReader for KubeSecrets {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        SecretStore::get(self, namespace, name).await
    }
}

/// Connects to remote clusters with `kube::Client`, bounding every request.
#[derive(Clone, Debug)]
pub struct KubeRemoteConnector {
    timeout: Duration,
}

impl KubeRemoteConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RemoteConnector for KubeRemoteConnector {
    async fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn RemoteSecretReader>> {
        let kubeconfig = credentials.kubeconfig()?;

        let mut config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::remote_connect(format!("invalid remote config: {e}")))?;
        check_remote_config(&config)?;
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);

        let client = Client::try_from(config)
            .map_err(|e| Error::remote_connect(format!("failed to build remote client: {e}")))?;

        Ok(Box::new(KubeSecrets::new(client)))
    }
}

/// The loader accepts a scheme-less server and CA data without any PEM block;
/// neither can reach the remote API server.
fn check_remote_config(config: &kube::Config) -> Result<()> {
    let url = &config.cluster_url;
    if !matches!(url.scheme_str(), Some("http" | "https")) || url.authority().is_none() {
        return Err(Error::remote_connect(format!(
            "remote host '{url}' is not an http(s) URL"
        )));
    }
    if config.root_cert.as_ref().is_none_or(Vec::is_empty) {
        return Err(Error::remote_connect("credentials 'ca' holds no PEM certificate"));
    }
    Ok(())
}

/// Reads the credentials secret next to `request` and opens a remote reader.
pub async fn resolve(
    secrets: &dyn SecretStore,
    connector: &dyn RemoteConnector,
    request: &SynchronizedSecret,
) -> Result<Box<dyn RemoteSecretReader>> {
    let namespace = request
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::InvalidSpec("SynchronizedSecret has no namespace".to_owned()))?;

    let creds_secret = secrets
        .get(namespace, CREDENTIALS_SECRET_NAME)
        .await
        .map_err(|e| Error::remote_connect(format!("failed to read '{CREDENTIALS_SECRET_NAME}': {e}")))?
        .ok_or_else(|| {
            Error::remote_connect(format!(
                "credentials secret '{namespace}/{CREDENTIALS_SECRET_NAME}' not found"
            ))
        })?;

    let credentials = RemoteCredentials::from_secret(&creds_secret)?;
    debug!(host = %credentials.host, "Connecting to remote cluster");

    connector.connect(&credentials).await
}

/// Point read of the remote secret; absence is [`Error::RemoteSecretMissing`].
pub async fn fetch(remote: &dyn RemoteSecretReader, namespace: &str, name: &str) -> Result<Secret> {
    match remote.get(namespace, name).await {
        Ok(Some(secret)) => Ok(secret),
        Ok(None) => Err(Error::RemoteSecretMissing {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }),
        Err(source) => Err(Error::RemoteRead {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            source,
        }),
    }
}
