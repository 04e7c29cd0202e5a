//! The `rendezvous-server` binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rendezvous::prelude::*;
use tracing_subscriber::EnvFilter;

/// Matchmaking server for two-player peer-to-peer games.
#[derive(Parser, Debug)]
#[command(name = "rendezvous-server", version, about)]
struct Cli {
    /// Config file (defaults to ./rendezvous.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Where the room snapshot is kept
    #[arg(long, value_name = "FILE")]
    rooms_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RendezvousError> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(rooms_file) = cli.rooms_file {
        config.rooms_file = rooms_file;
    }
    config.validate()?;

    let sink = Arc::new(JsonFileSink::new(config.rooms_file.clone()));
    // A corrupt snapshot is set aside; the server starts empty rather
    // than refusing to start.
    let rooms = sink.load_or_recover();
    tracing::info!(
        rooms = rooms.len(),
        path = %config.rooms_file.display(),
        "restored room snapshot"
    );

    let registry = Arc::new(RoomRegistry::restore(
        config.registry_config(),
        sink,
        Arc::new(SystemClock),
        rooms,
    ));

    let limits = registry.config();
    let reaper = Reaper::spawn(
        Arc::clone(&registry),
        limits.reap_interval,
        limits.room_timeout,
    );

    let server = RendezvousServer::builder()
        .bind(&config.listen_addr)
        .idle_timeout(config.connection_idle_timeout())
        .handshake_timeout(config.handshake_timeout())
        .build(registry)
        .await?;

    let result = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await;

    reaper.shutdown().await;
    result
}
