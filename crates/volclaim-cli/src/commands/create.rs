//! Create command: submit a claim and optionally wait for it to bind

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use volclaim_controller::{ControllerConfig, PollCadence};

use super::Context;
use crate::config::{load_manifest, load_state};
use crate::{Error, Result};

/// Create a claim from a manifest
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Claim manifest (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Seconds to wait for the claim to bind
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Seconds between status polls while waiting
    #[arg(long, default_value_t = 3)]
    pub poll_interval_secs: u64,

    /// Return as soon as the cluster accepts the claim
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn run(ctx: &Context, args: CreateArgs) -> Result<()> {
    let mut manifest = load_manifest(&args.file)?;
    if args.no_wait {
        manifest.wait_until_bound = false;
    }

    let mut state = load_state(&ctx.state_path)?;
    if let Some(id) = state.id.clone() {
        return Err(Error::AlreadyTracked {
            path: ctx.state_path.clone(),
            id,
        });
    }

    let config = ControllerConfig::default()
        .with_create_timeout(Duration::from_secs(args.timeout_secs))
        .with_cadence(PollCadence::fixed(Duration::from_secs(
            args.poll_interval_secs.max(1),
        )));
    let controller = ctx.controller(config).await?;

    let outcome = controller.create(&mut state, &manifest).await;
    ctx.finish(&state, outcome)?;

    let id = state.id.as_deref().unwrap_or_default();
    info!(id, "claim created");
    println!("{id}");
    Ok(())
}
