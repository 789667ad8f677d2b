//! Local files used by the CLI
//!
//! The claim record lives in a JSON state file (default
//! `volclaim-state.json`, override with `--state` or `VOLCLAIM_STATE`).
//! Desired state is read from a YAML or JSON manifest.
//!
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `VOLCLAIM_KUBECONFIG` environment variable
//! 3. Fall back to kube default (`KUBECONFIG` env / `~/.kube/config`)

use std::path::{Path, PathBuf};

use volclaim_controller::{ClaimManifest, ClaimState};

use crate::{Error, Result};

/// Default state file name, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "volclaim-state.json";

/// Environment variable naming a kubeconfig
pub const VOLCLAIM_KUBECONFIG_ENV: &str = "VOLCLAIM_KUBECONFIG";

/// Resolve the kubeconfig to use, or `None` for the kube default
pub fn resolve_kubeconfig(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_kubeconfig_from(explicit, std::env::var(VOLCLAIM_KUBECONFIG_ENV).ok())
}

fn resolve_kubeconfig_from(explicit: Option<&Path>, env: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    env.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Load the state file, returning an empty record if it does not exist
pub fn load_state(path: &Path) -> Result<ClaimState> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(ClaimState::from_json(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClaimState::default()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Load the state file, failing if it does not track a claim
pub fn load_tracked_state(path: &Path) -> Result<ClaimState> {
    let state = load_state(path)?;
    if state.id.is_none() {
        return Err(Error::NotTracked {
            path: path.to_path_buf(),
        });
    }
    Ok(state)
}

/// Write the state file
///
/// The record is written to a sibling temporary file and renamed into place
/// so an interrupted write never leaves a truncated record.
pub fn save_state(path: &Path, state: &ClaimState) -> Result<()> {
    let data = state.to_json()?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data).map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

/// Read a claim manifest from a YAML or JSON file
pub fn load_manifest(path: &Path) -> Result<ClaimManifest> {
    let data = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(ClaimManifest::from_yaml(&data)?)
}
