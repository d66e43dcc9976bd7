mod lyrics;
mod mpris;
mod session;
mod sync;

use crate::lyrics::LyricsCache;
use crate::mpris::Player;
use crate::session::Session;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Path to the local lyrics cache database
    #[arg(long, default_value = "lyricsdb.db")]
    database: PathBuf,
    /// Case-insensitive substring selecting the MPRIS player service to
    /// follow (e.g. "ncspot"); the first MPRIS service wins otherwise
    #[arg(long)]
    player: Option<String>,
    /// Poll interval for position and track-change checks, in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,
    /// Enable debug logging to stderr (RUST_LOG overrides)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cfg = Config::parse();
    let default_level = if cfg.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let poll_interval = Duration::from_millis(cfg.poll_interval_ms);
    let cache = match LyricsCache::open(&cfg.database).await {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %cfg.database.display(),
                "cannot open lyrics cache, continuing without it"
            );
            None
        }
    };

    // One session per discovered player; a dropped D-Bus connection or a
    // vanished player sends us back into discovery rather than crashing.
    loop {
        let service = wait_for_player(cfg.player.as_deref()).await;
        tracing::info!(service = %service, "following player");
        let session = Session::new(Player::new(service), cache.as_ref(), poll_interval);
        if let Err(e) = session.run().await {
            tracing::warn!(error = %e, "player session lost, rediscovering");
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn wait_for_player(filter: Option<&str>) -> String {
    let mut announced = false;
    loop {
        match mpris::find_player(filter).await {
            Ok(Some(service)) => return service,
            Ok(None) => {
                if !announced {
                    println!("Waiting for a player to appear....");
                    announced = true;
                }
            }
            Err(e) => tracing::warn!(error = %e, "D-Bus unavailable, retrying"),
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
