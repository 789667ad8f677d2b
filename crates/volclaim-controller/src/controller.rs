//! Lifecycle controller for a single managed claim
//!
//! Each operation takes the local `ClaimState` record, talks to the cluster
//! through `ClaimApi`, and leaves the record describing what it now owns.
//! Only `create` spans wall-clock time: with the wait flag set it polls the
//! claim until it binds, and on failure attaches recent warning events from
//! the claim (or, failing that, its volume) to the returned error.
//!
//! A timed-out create is not rolled back. The identity stays recorded so a
//! later read or delete still targets the object.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use tracing::{debug, info, instrument, warn};

use volclaim_common::{ClaimId, Error, CLAIM_KIND, VOLUME_KIND};

use crate::client::ClaimApi;
use crate::clock::Clock;
use crate::diagnostics::{self, render_events, ObjectTarget, DEFAULT_EVENT_LIMIT};
use crate::manifest::{ClaimManifest, DEFAULT_NAMESPACE};
use crate::patch::diff_metadata;
use crate::state::{ClaimPhase, ClaimState, Lifecycle};
use crate::translate;
use crate::wait::{PhaseWaiter, PollCadence};

/// Default deadline for a claim to bind after creation
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Tunables for the lifecycle operations
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// How long `create` waits for the claim to bind
    pub create_timeout: Duration,
    /// Poll schedule while waiting
    pub cadence: PollCadence,
    /// Maximum warning events attached to a failed create
    pub event_limit: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            create_timeout: DEFAULT_CREATE_TIMEOUT,
            cadence: PollCadence::default(),
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

impl ControllerConfig {
    /// Override the bind deadline
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Override the poll schedule
    pub fn with_cadence(mut self, cadence: PollCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Override the number of diagnostic events
    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit;
        self
    }
}

/// Result of a read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// The claim exists and the record was refreshed
    Present,
    /// The claim is gone and the record was cleared
    Absent,
}

/// Drives one claim through create, read, update and delete
pub struct ClaimController {
    api: Arc<dyn ClaimApi>,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
}

impl ClaimController {
    /// Create a controller over an explicit API handle and clock
    pub fn new(api: Arc<dyn ClaimApi>, clock: Arc<dyn Clock>, config: ControllerConfig) -> Self {
        Self { api, clock, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Create the claim described by `manifest` and record its identity
    ///
    /// With `wait_until_bound` set, blocks until the claim reports `Bound`,
    /// any other non-`Pending` phase, or the create timeout. Failures carry
    /// up to `event_limit` recent warning events.
    #[instrument(
        skip(self, state, manifest),
        fields(namespace = %manifest.metadata.namespace, wait = manifest.wait_until_bound)
    )]
    pub async fn create(&self, state: &mut ClaimState, manifest: &ClaimManifest) -> Result<(), Error> {
        manifest.validate()?;
        state.wait_until_bound = manifest.wait_until_bound;
        state.lifecycle = Lifecycle::Creating;

        let request = translate::expand(manifest);
        let created = match self.api.create(&manifest.metadata.namespace, &request).await {
            Ok(created) => created,
            Err(e) => {
                state.lifecycle = Lifecycle::Absent;
                return Err(e);
            }
        };

        let id = translate::claim_id(&created);
        state.set_id(&id);
        info!(id = %id, "claim created");

        if state.wait_until_bound {
            state.lifecycle = Lifecycle::WaitingForBound;
            self.wait_for_bound(&id, &created).await?;
            state.lifecycle = Lifecycle::Bound;
        }

        match self.read(state).await? {
            Presence::Present => Ok(()),
            Presence::Absent => Err(Error::not_found(CLAIM_KIND, id.encode())),
        }
    }

    async fn wait_for_bound(&self, id: &ClaimId, created: &PersistentVolumeClaim) -> Result<(), Error> {
        let waiter = PhaseWaiter::new(
            [ClaimPhase::Bound],
            [ClaimPhase::Pending],
            self.config.create_timeout,
        )
        .with_cadence(self.config.cadence.clone());

        let api = self.api.as_ref();
        let outcome = waiter
            .wait(self.clock.as_ref(), || async move {
                let claim = api.get(&id.namespace, &id.name).await?;
                let phase = translate::phase(&claim);
                Ok::<_, Error>((claim, phase))
            })
            .await;

        let (err, volume) = match outcome {
            Ok(resolution) => {
                let volume = resolution
                    .observation()
                    .and_then(translate::bound_volume)
                    .map(str::to_string);
                match waiter.into_result(resolution) {
                    Ok(_) => return Ok(()),
                    Err(e) => (e, volume),
                }
            }
            Err(e) => (e, None),
        };
        let volume = volume.or_else(|| translate::bound_volume(created).map(str::to_string));
        Err(self.diagnose(id, volume.as_deref(), err).await)
    }

    /// Attach warning events to `err`; a failed event query replaces it
    async fn diagnose(&self, id: &ClaimId, volume: Option<&str>, err: Error) -> Error {
        let primary = ObjectTarget::new(CLAIM_KIND, id);
        let related = volume.map(|v| ObjectTarget::cluster_scoped(VOLUME_KIND, v));
        match diagnostics::collect(
            self.api.as_ref(),
            &primary,
            related.as_ref(),
            self.config.event_limit,
        )
        .await
        {
            Ok(events) => {
                debug!(count = events.len(), "attaching warning events");
                Error::diagnosed(err, render_events(&events))
            }
            Err(query_err) => {
                warn!(error = %err, "event lookup failed after wait error");
                query_err
            }
        }
    }

    /// Refresh the record from the cluster
    ///
    /// A missing claim clears the record and reports `Absent`; every other
    /// failure is returned.
    #[instrument(skip(self, state), fields(id = state.id.as_deref().unwrap_or_default()))]
    pub async fn read(&self, state: &mut ClaimState) -> Result<Presence, Error> {
        let id = state.claim_id()?;
        match self.api.get(&id.namespace, &id.name).await {
            Ok(claim) => {
                let observed = translate::flatten(&claim);
                debug!(phase = %observed.status.phase, "claim observed");
                state.metadata = Some(observed.metadata);
                state.spec = Some(observed.spec);
                state.status = Some(observed.status);
                state.lifecycle = Lifecycle::Ready;
                Ok(Presence::Present)
            }
            Err(e) if e.is_not_found() => {
                info!("claim no longer exists, clearing record");
                state.clear();
                Ok(Presence::Absent)
            }
            Err(e) => Err(e),
        }
    }

    /// Bring labels and annotations in line with `manifest`
    ///
    /// The spec is immutable once created; any change to it, or to the
    /// claim's name or namespace, is rejected before contacting the cluster.
    #[instrument(skip(self, state, manifest), fields(id = state.id.as_deref().unwrap_or_default()))]
    pub async fn update(&self, state: &mut ClaimState, manifest: &ClaimManifest) -> Result<(), Error> {
        manifest.validate()?;
        let id = state.claim_id()?;

        if manifest.metadata.namespace != id.namespace {
            return Err(Error::validation_for_field(
                "metadata.namespace",
                format!(
                    "namespace cannot change from '{}' to '{}'; the claim must be replaced",
                    id.namespace, manifest.metadata.namespace
                ),
            ));
        }
        if let Some(name) = manifest.metadata.name.as_deref() {
            if name != id.name {
                return Err(Error::validation_for_field(
                    "metadata.name",
                    format!(
                        "name cannot change from '{}' to '{}'; the claim must be replaced",
                        id.name, name
                    ),
                ));
            }
        }
        if let Some(current) = &state.spec {
            let changed = manifest.spec.changed_fields(current);
            if !changed.is_empty() {
                return Err(Error::validation_for_field(
                    "spec",
                    format!(
                        "immutable fields changed ({}); the claim must be replaced",
                        changed.join(", ")
                    ),
                ));
            }
        }

        state.lifecycle = Lifecycle::Updating;
        state.wait_until_bound = manifest.wait_until_bound;

        let live = self.api.get(&id.namespace, &id.name).await?;
        let patch = diff_metadata(&live.metadata, &manifest.metadata);
        if patch.is_empty() {
            debug!("metadata already up to date");
        } else {
            info!(ops = %patch, "patching claim metadata");
            self.api.patch(&id.namespace, &id.name, &patch).await?;
        }

        match self.read(state).await? {
            Presence::Present => Ok(()),
            Presence::Absent => Err(Error::not_found(CLAIM_KIND, id.encode())),
        }
    }

    /// Delete the claim; an already-missing claim counts as deleted
    #[instrument(skip(self, state), fields(id = state.id.as_deref().unwrap_or_default()))]
    pub async fn delete(&self, state: &mut ClaimState) -> Result<(), Error> {
        let id = state.claim_id()?;
        state.lifecycle = Lifecycle::Deleting;
        match self.api.delete(&id.namespace, &id.name).await {
            Ok(()) => info!("claim deleted"),
            Err(e) if e.is_not_found() => debug!("claim already absent"),
            Err(e) => return Err(e),
        }
        state.clear();
        Ok(())
    }

    /// Whether the recorded claim exists
    ///
    /// Only not-found maps to `false`; any other failure is returned so
    /// callers can tell absence from an unanswered question.
    #[instrument(skip(self, state), fields(id = state.id.as_deref().unwrap_or_default()))]
    pub async fn exists(&self, state: &ClaimState) -> Result<bool, Error> {
        let id = state.claim_id()?;
        match self.api.get(&id.namespace, &id.name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Seed a record for an existing claim from `namespace/name`
    ///
    /// A bare `name` refers to the `default` namespace. The wait flag is set,
    /// matching a claim created by this controller with defaults.
    pub fn import(id: &str) -> Result<ClaimState, Error> {
        let mut id: ClaimId = id.parse()?;
        if id.is_cluster_scoped() {
            id.namespace = DEFAULT_NAMESPACE.to_string();
        }
        let mut state = ClaimState::new(true);
        state.set_id(&id);
        Ok(state)
    }
}
