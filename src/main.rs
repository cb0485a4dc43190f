use bundle_dl::{Config, logging};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Bundle remote files into ZIP archives over a small REST API
#[derive(Clone, Debug, Parser)]
#[command(name = "bundle-dl", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `api.bind_address`
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override `storage_dir`
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging()?;

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.api.bind_address = bind;
    }
    if let Some(dir) = args.storage_dir {
        config.storage.storage_dir = dir;
    }

    tracing::info!(
        config = ?args.config,
        bind_address = %config.api.bind_address,
        storage_dir = %config.storage.storage_dir.display(),
        "Starting bundle-dl"
    );

    bundle_dl::run(config).await?;
    Ok(())
}
