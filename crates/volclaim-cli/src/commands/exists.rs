//! Exists command: print whether the tracked claim is present

use clap::Args;

use volclaim_controller::ControllerConfig;

use super::Context;
use crate::config::load_tracked_state;
use crate::Result;

/// Report whether the tracked claim exists
#[derive(Args, Debug)]
pub struct ExistsArgs {}

pub async fn run(ctx: &Context, _args: ExistsArgs) -> Result<()> {
    let state = load_tracked_state(&ctx.state_path)?;
    let controller = ctx.controller(ControllerConfig::default()).await?;
    println!("{}", controller.exists(&state).await?);
    Ok(())
}
