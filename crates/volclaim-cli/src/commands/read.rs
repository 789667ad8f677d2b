//! Read command: refresh the state file from the cluster

use clap::Args;

use volclaim_controller::{ControllerConfig, Presence};

use super::Context;
use crate::config::load_tracked_state;
use crate::Result;

/// Refresh and print the claim record
#[derive(Args, Debug)]
pub struct ReadArgs {}

pub async fn run(ctx: &Context, _args: ReadArgs) -> Result<()> {
    let mut state = load_tracked_state(&ctx.state_path)?;
    let id = state.id.clone().unwrap_or_default();
    let controller = ctx.controller(ControllerConfig::default()).await?;

    let outcome = controller.read(&mut state).await;
    match ctx.finish(&state, outcome)? {
        Presence::Present => println!("{}", state.to_json()?),
        Presence::Absent => println!("claim {id} no longer exists; state cleared"),
    }
    Ok(())
}
