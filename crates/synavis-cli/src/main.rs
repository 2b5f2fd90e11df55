//! Synavis scene-control server
//!
//! Serves the headless scene over TCP (default 127.0.0.1:50121) or a Unix
//! socket. An optional settings file is applied before the first connection.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use synavis_headless::{HeadlessConfig, HeadlessScene};
use synavis_server::{DEFAULT_BIND, ServerConfig, SettingsLoader, SynavisServer};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "synavis-server", version, about = "Remote scene-control server")]
struct Args {
    /// TCP address to listen on
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,

    /// Listen on a Unix socket instead of TCP
    #[arg(long)]
    unix: Option<PathBuf>,

    /// Ticks per second driving telemetry and asset loads
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// JSON settings file applied at startup
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Object receiving settings blobs (default: world settings)
    #[arg(long)]
    settings_target: Option<String>,

    /// Start with an empty scene
    #[arg(long)]
    empty: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Synavis server v{} starting", env!("CARGO_PKG_VERSION"));

    let mut scene = HeadlessScene::new(HeadlessConfig {
        demo_scene: !args.empty,
        settings_target: args.settings_target.clone(),
        ..Default::default()
    });

    if let Some(path) = &args.settings {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let blob: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        scene.apply_settings(&blob)?;
        info!("Applied settings from {}", path.display());
    }

    let config = ServerConfig::default().with_tick_rate(args.tick_rate);
    let server = SynavisServer::new(scene, config);

    match args.unix {
        #[cfg(unix)]
        Some(path) => server.run_unix(&path).await?,
        #[cfg(not(unix))]
        Some(_) => anyhow::bail!("Unix sockets are not available on this platform"),
        None => server.run_tcp(&args.bind).await?,
    }

    Ok(())
}
