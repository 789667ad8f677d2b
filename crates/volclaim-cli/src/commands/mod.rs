//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;

use volclaim_common::kube_utils::create_client;
use volclaim_controller::{ClaimController, ClaimState, ControllerConfig, KubeClaimApi, TokioClock};

use crate::config::{resolve_kubeconfig, save_state};
use crate::Result;

pub mod create;
pub mod delete;
pub mod exists;
pub mod import;
pub mod read;
pub mod update;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    /// State file recording the managed claim
    pub state_path: PathBuf,
    /// Explicit kubeconfig, if given on the command line
    pub kubeconfig: Option<PathBuf>,
}

impl Context {
    /// Build a controller connected to the resolved cluster
    pub async fn controller(&self, config: ControllerConfig) -> Result<ClaimController> {
        let kubeconfig = resolve_kubeconfig(self.kubeconfig.as_deref());
        let client = create_client(kubeconfig.as_deref()).await?;
        Ok(ClaimController::new(
            Arc::new(KubeClaimApi::new(client)),
            Arc::new(TokioClock),
            config,
        ))
    }

    /// Persist `state`, then surface the operation's outcome
    ///
    /// The record is saved even when the operation failed so that a claim
    /// created before a timeout stays tracked.
    pub fn finish<T>(
        &self,
        state: &ClaimState,
        outcome: std::result::Result<T, volclaim_common::Error>,
    ) -> Result<T> {
        save_state(&self.state_path, state)?;
        Ok(outcome?)
    }
}
