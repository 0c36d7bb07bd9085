use anyhow::{bail, Result};
use clap::Parser;
use tracing::debug;

mod get;
use get::GetManga;

#[tokio::main]
async fn main() -> Result<()> {
    let manga = GetManga::parse();

    // RUST_LOG wins over --verbose
    let default_level = match manga.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    debug!(?manga, "Arguments parsed");

    if !manga.get().await? {
        bail!("Some chapters failed to download");
    }

    Ok(())
}
