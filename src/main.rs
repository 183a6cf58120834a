use clap::Parser;
use feed_mirror::{Config, FeedMirror, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feed-mirror", about = "Mirror a creator feed and its assets")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "feed-mirror.toml")]
    config: PathBuf,

    /// Keep polling every `sync.poll_interval` until interrupted
    #[arg(long)]
    watch: bool,
}

async fn run(cli: Cli) -> feed_mirror::Result<()> {
    let config = Config::load(&cli.config).await?;
    let mirror = FeedMirror::new(config).await?;

    if cli.watch {
        return run_with_shutdown(&mirror).await;
    }

    let report = mirror.run_once().await?;
    tracing::info!(
        pages = report.pages_fetched,
        kept = report.posts_kept,
        dropped = report.posts_dropped,
        authors = report.authors,
        assets_stored = report.assets_stored,
        assets_present = report.assets_already_present,
        assets_failed = report.assets_failed,
        "Mirror pass complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "feed-mirror failed");
            ExitCode::FAILURE
        }
    }
}
