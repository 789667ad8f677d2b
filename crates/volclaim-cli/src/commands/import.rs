//! Import command: start tracking a claim created elsewhere

use clap::Args;
use tracing::info;

use volclaim_common::{Error as ClaimError, CLAIM_KIND};
use volclaim_controller::{ClaimController, ControllerConfig, Presence};

use super::Context;
use crate::config::load_state;
use crate::{Error, Result};

/// Track an existing claim
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Claim identity, `namespace/name` or `name` (default namespace)
    pub id: String,
}

pub async fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    if let Some(id) = load_state(&ctx.state_path)?.id {
        return Err(Error::AlreadyTracked {
            path: ctx.state_path.clone(),
            id,
        });
    }

    let mut state = ClaimController::import(&args.id)?;
    let id = state.id.clone().unwrap_or_default();
    let controller = ctx.controller(ControllerConfig::default()).await?;

    match controller.read(&mut state).await? {
        Presence::Present => {
            ctx.finish(&state, Ok(()))?;
            info!(id, "claim imported");
            Ok(())
        }
        Presence::Absent => Err(ClaimError::not_found(CLAIM_KIND, id).into()),
    }
}
