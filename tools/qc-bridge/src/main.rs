//! QC-Bridge: command-line front end for bridge withdrawals.

use anyhow::Result;
use bridge_telemetry::{init_telemetry, TelemetryConfig};
use clap::Parser;
use qc_bridge::{commands, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&TelemetryConfig::from_env())?;
    commands::run(cli).await
}
