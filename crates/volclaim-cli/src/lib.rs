//! volclaim CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use volclaim_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};

use commands::Context;

/// volclaim - manage a PersistentVolumeClaim from a manifest and a local state file
#[derive(Parser, Debug)]
#[command(name = "volclaim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to kubeconfig (falls back to VOLCLAIM_KUBECONFIG, then the kube default)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// State file recording the managed claim
    #[arg(long, global = true, env = "VOLCLAIM_STATE", default_value = config::DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// Log format: text or json
    #[arg(long, global = true, env = "VOLCLAIM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a claim from a manifest and wait for it to bind
    Create(commands::create::CreateArgs),
    /// Refresh the state file from the cluster and print it
    Read(commands::read::ReadArgs),
    /// Apply label and annotation changes from a manifest
    Update(commands::update::UpdateArgs),
    /// Delete the claim
    Delete(commands::delete::DeleteArgs),
    /// Report whether the claim exists
    Exists(commands::exists::ExistsArgs),
    /// Start tracking an existing claim by namespace/name
    Import(commands::import::ImportArgs),
}

impl Cli {
    /// Install the tracing subscriber for the selected log format
    pub fn init_telemetry(&self) -> Result<()> {
        let format: LogFormat = self.log_format.parse()?;
        init_telemetry(TelemetryConfig {
            format,
            ..Default::default()
        })?;
        Ok(())
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let ctx = Context {
            state_path: self.state,
            kubeconfig: self.kubeconfig,
        };
        match self.command {
            Commands::Create(args) => commands::create::run(&ctx, args).await,
            Commands::Read(args) => commands::read::run(&ctx, args).await,
            Commands::Update(args) => commands::update::run(&ctx, args).await,
            Commands::Delete(args) => commands::delete::run(&ctx, args).await,
            Commands::Exists(args) => commands::exists::run(&ctx, args).await,
            Commands::Import(args) => commands::import::run(&ctx, args).await,
        }
    }
}
