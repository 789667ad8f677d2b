//! Update command: patch labels and annotations

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use volclaim_controller::ControllerConfig;

use super::Context;
use crate::config::{load_manifest, load_tracked_state};
use crate::Result;

/// Apply metadata changes from a manifest
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Claim manifest (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

pub async fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let manifest = load_manifest(&args.file)?;
    let mut state = load_tracked_state(&ctx.state_path)?;
    let controller = ctx.controller(ControllerConfig::default()).await?;

    let outcome = controller.update(&mut state, &manifest).await;
    ctx.finish(&state, outcome)?;

    info!(id = state.id.as_deref().unwrap_or_default(), "claim updated");
    Ok(())
}
