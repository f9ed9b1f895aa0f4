use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use remote_secret_sync::{config::Settings, crds::SynchronizedSecret};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the controller
    Run(Settings),
    /// Print the SynchronizedSecret CRD
    Crds,
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Crds => {
            println!("{}", serde_yaml::to_string(&SynchronizedSecret::crd())?);
        }
        Command::Run(settings) => {
            init_logging(settings.log_json);
            remote_secret_sync::run(settings).await?;
        }
    };

    Ok(())
}
