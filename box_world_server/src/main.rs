use std::path::PathBuf;

use anyhow::{Context, Result};
use box_world_server::{ServerConfig, serve};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Serves a box-stacking robot simulation to a polling renderer",
    long_about = None
)]
struct Args {
    /// TOML config file; flags override its values
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Grid rows (M)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns (N)
    #[arg(long)]
    cols: Option<usize>,

    /// Number of robots
    #[arg(long)]
    robots: Option<usize>,

    /// Number of single boxes scattered at start
    #[arg(long)]
    boxes: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        let simulation = &mut config.simulation;
        if let Some(rows) = self.rows {
            simulation.rows = rows;
        }
        if let Some(cols) = self.cols {
            simulation.cols = cols;
        }
        if let Some(robots) = self.robots {
            simulation.robots = robots;
        }
        if let Some(boxes) = self.boxes {
            simulation.boxes = boxes;
        }
        if self.seed.is_some() {
            simulation.seed = self.seed;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Args::parse().into_config()?;
    serve(config, shutdown_signal()).await?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => warn!(%err, "failed to listen for ctrl-c"),
    }
}
