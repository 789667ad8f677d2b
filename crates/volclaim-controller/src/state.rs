//! Local controller record for one managed claim
//!
//! The cluster is the source of truth; this record only remembers which
//! object we own, the last desired/observed mirrors, and the wait flag.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use volclaim_common::{ClaimId, Error};

use crate::manifest::{ClaimMetadata, ClaimSpec};

/// Phase reported by the cluster for a claim
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClaimPhase {
    /// Not yet bound to a volume
    Pending,
    /// Bound to a volume
    Bound,
    /// The bound volume disappeared
    Lost,
    /// Any phase this controller does not know about
    Other(String),
}

impl ClaimPhase {
    /// Parse the optional `status.phase` string
    ///
    /// The API server defaults a fresh claim to `Pending`, so an absent phase
    /// is read the same way.
    pub fn from_status(phase: Option<&str>) -> Self {
        match phase {
            None | Some("") => ClaimPhase::Pending,
            Some(p) => ClaimPhase::from(p.to_string()),
        }
    }

    /// Wire name of the phase
    pub fn as_str(&self) -> &str {
        match self {
            ClaimPhase::Pending => "Pending",
            ClaimPhase::Bound => "Bound",
            ClaimPhase::Lost => "Lost",
            ClaimPhase::Other(p) => p,
        }
    }
}

impl From<String> for ClaimPhase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => ClaimPhase::Pending,
            "Bound" => ClaimPhase::Bound,
            "Lost" => ClaimPhase::Lost,
            _ => ClaimPhase::Other(value),
        }
    }
}

impl From<ClaimPhase> for String {
    fn from(value: ClaimPhase) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster-reported status of a claim
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedStatus {
    /// Current phase
    pub phase: ClaimPhase,
    /// Volume the claim is bound to, absent while pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    /// Capacity of the bound volume
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity: BTreeMap<String, String>,
}

/// Where a managed claim is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// No remote object is owned
    #[default]
    Absent,
    /// Create request in flight
    Creating,
    /// Created, waiting for the claim to bind
    WaitingForBound,
    /// Bound, observed state not yet refreshed
    Bound,
    /// Observed state refreshed
    Ready,
    /// Metadata patch in flight
    Updating,
    /// Delete request in flight
    Deleting,
}

/// Persisted controller record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimState {
    /// Encoded identity of the owned claim, `None` when nothing is owned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Block creation until bound
    pub wait_until_bound: bool,
    /// Desired-shaped mirror of the last read metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ClaimMetadata>,
    /// Desired-shaped mirror of the last read spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ClaimSpec>,
    /// Last observed status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ObservedStatus>,
    /// Lifecycle position
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl Default for ClaimState {
    fn default() -> Self {
        Self {
            id: None,
            wait_until_bound: true,
            metadata: None,
            spec: None,
            status: None,
            lifecycle: Lifecycle::Absent,
        }
    }
}

impl ClaimState {
    /// Empty record with the given wait flag
    pub fn new(wait_until_bound: bool) -> Self {
        Self {
            wait_until_bound,
            ..Default::default()
        }
    }

    /// Decode the owned identity
    ///
    /// Fails with `MalformedIdentity` when nothing is owned or the stored
    /// string does not decode.
    pub fn claim_id(&self) -> Result<ClaimId, Error> {
        match self.id.as_deref() {
            Some(id) => id.parse(),
            None => Err(Error::malformed_identity("", "no identity recorded")),
        }
    }

    /// Record ownership of `id`
    pub fn set_id(&mut self, id: &ClaimId) {
        self.id = Some(id.encode());
    }

    /// Forget the owned object and its mirrors
    pub fn clear(&mut self) {
        self.id = None;
        self.metadata = None;
        self.spec = None;
        self.status = None;
        self.lifecycle = Lifecycle::Absent;
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization(format!("failed to serialize claim state: {}", e)))
    }

    /// Deserialize from JSON
    pub fn from_json(input: &str) -> Result<Self, Error> {
        serde_json::from_str(input)
            .map_err(|e| Error::serialization(format!("failed to parse claim state: {}", e)))
    }
}
