//! Delete command

use clap::Args;
use tracing::info;

use volclaim_controller::ControllerConfig;

use super::Context;
use crate::config::load_tracked_state;
use crate::Result;

/// Delete the tracked claim
#[derive(Args, Debug)]
pub struct DeleteArgs {}

pub async fn run(ctx: &Context, _args: DeleteArgs) -> Result<()> {
    let mut state = load_tracked_state(&ctx.state_path)?;
    let id = state.id.clone().unwrap_or_default();
    let controller = ctx.controller(ControllerConfig::default()).await?;

    let outcome = controller.delete(&mut state).await;
    ctx.finish(&state, outcome)?;

    info!(id, "claim deleted");
    Ok(())
}
