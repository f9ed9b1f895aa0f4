use thiserror::Error;

/// Status codes written to `status.status` of a SynchronizedSecret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    ConfigReadFailed,
    RemoteConnect,
    RemoteReadFailed,
    InSync,
}

impl StatusCode {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::ConfigReadFailed => "err:config-read-failed",
            StatusCode::RemoteConnect => "err:remote-connect",
            StatusCode::RemoteReadFailed => "err:remote-read-failed",
            StatusCode::InSync => "insync",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read SynchronizedSecret {namespace}/{name}: {source}")]
    ConfigRead {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid SynchronizedSecret spec: {0}")]
    InvalidSpec(String),

    #[error("failed to connect to remote cluster: {0}")]
    RemoteConnect(String),

    #[error("remote secret {namespace}/{name} not found")]
    RemoteSecretMissing { namespace: String, name: String },

    #[error("failed to read remote secret {namespace}/{name}: {source}")]
    RemoteRead {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to {action} local secret {namespace}/{name}: {source}")]
    Convergence {
        action: &'static str,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("local secret {namespace}/{name} is controlled by another owner ({owner})")]
    OwnershipConflict {
        namespace: String,
        name: String,
        owner: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn remote_connect(msg: impl Into<String>) -> Self {
        Self::RemoteConnect(msg.into())
    }

    /// Status code recorded for this failure. `None` leaves status untouched.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::InvalidSpec(_) => Some(StatusCode::ConfigReadFailed),
            Error::RemoteConnect(_) => Some(StatusCode::RemoteConnect),
            Error::RemoteSecretMissing { .. } | Error::RemoteRead { .. } => {
                Some(StatusCode::RemoteReadFailed)
            }
            Error::ConfigRead { .. } | Error::Convergence { .. } | Error::OwnershipConflict { .. } => {
                None
            }
        }
    }

    /// Expected conditions end the cycle normally with a re-check instead of an error.
    pub fn is_expected(&self) -> bool {
        matches!(self, Error::RemoteSecretMissing { .. })
    }
}
