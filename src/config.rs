use std::time::Duration;

use clap::Args;

/// Options for the `run` subcommand.
#[derive(Args, Clone, Debug)]
pub struct Settings {
    /// Seconds between re-checks of every SynchronizedSecret
    #[arg(
        long,
        env = "SECRET_SYNC_REQUEUE_SECS",
        default_value_t = 600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub requeue_interval_secs: u64,

    /// Connect and read timeout for requests to the remote cluster, in seconds
    #[arg(
        long,
        env = "SECRET_SYNC_REMOTE_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub remote_timeout_secs: u64,

    /// Emit logs as JSON
    #[arg(long, env = "SECRET_SYNC_LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            requeue_interval_secs: 600,
            remote_timeout_secs: 30,
            log_json: false,
        }
    }
}
