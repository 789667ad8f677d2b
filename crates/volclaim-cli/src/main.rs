//! volclaim CLI
//!
//! Drives a single PersistentVolumeClaim through its lifecycle from a
//! manifest and a local JSON state file.

use clap::Parser;

use volclaim_cli::{Cli, Result};

async fn run(cli: Cli) -> Result<()> {
    cli.init_telemetry()?;
    cli.run().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", e.report());
        std::process::exit(1);
    }
}
