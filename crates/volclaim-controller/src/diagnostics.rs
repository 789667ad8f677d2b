//! Warning-event aggregation for failed waits
//!
//! When a claim does not bind, the reason is usually recorded as a `Warning`
//! event on the claim itself or, if provisioning failed upstream, on the
//! backing volume. `collect` queries the claim first and falls back to the
//! related object only when the claim has no warnings at all.

use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use tracing::debug;

use volclaim_common::{ClaimId, Error};

use crate::client::ClaimApi;

/// Default number of events attached to an error
pub const DEFAULT_EVENT_LIMIT: usize = 3;

/// Object whose events are queried
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTarget {
    /// Object kind, e.g. `PersistentVolumeClaim`
    pub kind: String,
    /// Namespace, empty for cluster-scoped objects
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectTarget {
    /// Namespaced object
    pub fn new(kind: impl Into<String>, id: &ClaimId) -> Self {
        Self {
            kind: kind.into(),
            namespace: id.namespace.clone(),
            name: id.name.clone(),
        }
    }

    /// Cluster-scoped object
    pub fn cluster_scoped(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: String::new(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            ClaimId::new(self.namespace.as_str(), self.name.as_str())
        )
    }
}

/// A warning event reduced to what is shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarningEvent {
    /// Kind of the object the event is about
    pub object_kind: String,
    /// Name of the object the event is about
    pub object_name: String,
    /// Short machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
    /// Most recent time the event was seen
    pub timestamp: Option<DateTime<Utc>>,
    /// Number of occurrences
    pub count: i32,
}

impl WarningEvent {
    /// Reduce a core/v1 Event, or `None` if it is not a warning
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.type_.as_deref() != Some("Warning") {
            return None;
        }
        let timestamp = event
            .last_timestamp
            .as_ref()
            .map(|t| t.0)
            .or_else(|| event.event_time.as_ref().map(|t| t.0))
            .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))
            .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0));
        Some(Self {
            object_kind: event.involved_object.kind.clone().unwrap_or_default(),
            object_name: event.involved_object.name.clone().unwrap_or_default(),
            reason: event.reason.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            timestamp,
            count: event.count.unwrap_or(1),
        })
    }
}

/// Fetch the most recent warnings for `primary`, falling back to `related`
///
/// Returns at most `limit` events, newest first. An empty result is not an
/// error; a failed query is reported as `DiagnosticQuery` naming the object.
pub async fn collect(
    api: &dyn ClaimApi,
    primary: &ObjectTarget,
    related: Option<&ObjectTarget>,
    limit: usize,
) -> Result<Vec<WarningEvent>, Error> {
    let events = recent_warnings(api, primary, limit).await?;
    if !events.is_empty() {
        return Ok(events);
    }
    match related {
        Some(related) => {
            debug!(primary = %primary, related = %related, "no warnings on primary, checking related object");
            recent_warnings(api, related, limit).await
        }
        None => Ok(events),
    }
}

async fn recent_warnings(
    api: &dyn ClaimApi,
    target: &ObjectTarget,
    limit: usize,
) -> Result<Vec<WarningEvent>, Error> {
    let events = api
        .list_warning_events(target)
        .await
        .map_err(|e| Error::diagnostic_query(target.kind.as_str(), target.to_string(), e))?;

    let mut warnings: Vec<WarningEvent> = events.iter().filter_map(WarningEvent::from_event).collect();
    // Newest first; events without any timestamp sort last.
    warnings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    warnings.truncate(limit);
    debug!(target = %target, count = warnings.len(), "collected warning events");
    Ok(warnings)
}

/// Render events for appending to an error message
///
/// Each event becomes one line prefixed with a newline, with an `(xN)`
/// suffix when it repeated; no events renders as an empty string.
pub fn render_events(events: &[WarningEvent]) -> String {
    events
        .iter()
        .map(|e| {
            let repeats = if e.count > 1 {
                format!(" (x{})", e.count)
            } else {
                String::new()
            };
            format!(
                "\n * {} ({}): {}: {}{}",
                e.object_name, e.object_kind, e.reason, e.message, repeats
            )
        })
        .collect()
}
