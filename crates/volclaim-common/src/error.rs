//! Error types for volclaim
//!
//! Errors are structured with fields so that callers can branch on the
//! failure category without string matching. Remote failures are classified
//! once, at the cluster API seam, into `NotFound` or `Transport`; everything
//! downstream matches on variants.

use std::time::Duration;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for volclaim operations
#[derive(Debug, Error)]
pub enum Error {
    /// A stored identity string could not be decoded into namespace and name
    #[error("malformed identity {id:?}: {reason}")]
    MalformedIdentity {
        /// The identity string as found in local state
        id: String,
        /// Why it was rejected
        reason: String,
    },

    /// The remote object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of the missing object (e.g. "PersistentVolumeClaim")
        kind: String,
        /// Encoded identity of the missing object
        name: String,
    },

    /// The underlying cluster call failed (network, auth, serialization, API rejection)
    #[error("transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status carried by an API response, if the server answered
        status: Option<u16>,
        /// Description of what failed
        message: String,
    },

    /// The wait deadline elapsed before the object reached its target phase
    #[error(
        "timeout while waiting for state to become '{target}' (last state: '{}', timeout: {timeout:?})",
        .last_phase.as_deref().unwrap_or("")
    )]
    ConvergenceTimeout {
        /// Target phase(s) the wait was for
        target: String,
        /// Last phase observed before the deadline, if any poll completed
        last_phase: Option<String>,
        /// The configured deadline
        timeout: Duration,
    },

    /// The observed phase left the accepted pending/target set
    #[error("unexpected state '{phase}', wanted target '{target}'")]
    ConvergenceFailed {
        /// Target phase(s) the wait was for
        target: String,
        /// The offending phase
        phase: String,
    },

    /// Looking up warning events for diagnostics failed
    #[error("failed to query warning events for {kind} {name}: {source}")]
    DiagnosticQuery {
        /// Kind of the object whose events were queried
        kind: String,
        /// Identity of the object whose events were queried
        name: String,
        /// The underlying query failure
        source: Box<Error>,
    },

    /// A convergence failure annotated with recent warning events
    #[error("{source}{events}")]
    Diagnosed {
        /// The original wait error
        source: Box<Error>,
        /// Rendered warning events, empty when none were found
        events: String,
    },

    /// Desired state is invalid or asks for an impossible change
    #[error("validation error{}: {message}", .field.as_deref().map(|f| format!(" at {f}")).unwrap_or_default())]
    Validation {
        /// The offending field path (e.g. "spec.accessModes")
        field: Option<String>,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g. "create_client", "state")
        context: String,
    },
}

impl Error {
    /// Classify a kube-rs error for the object `kind`/`name`.
    ///
    /// A 404 API response becomes `NotFound`; any other API response keeps its
    /// status code in `Transport`; client-side failures carry no status.
    pub fn from_kube(err: kube::Error, kind: impl Into<String>, name: impl Into<String>) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                kind: kind.into(),
                name: name.into(),
            },
            kube::Error::Api(response) => Self::Transport {
                status: Some(response.code),
                message: format!("{}: {}", response.reason, response.message),
            },
            other => Self::Transport {
                status: None,
                message: other.to_string(),
            },
        }
    }

    /// Create a malformed identity error
    pub fn malformed_identity(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a transport error without a status code
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a transport error carrying an API status code
    pub fn transport_with_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: msg.into(),
        }
    }

    /// Create a validation error pointing at a field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Wrap an event lookup failure for the given object
    pub fn diagnostic_query(kind: impl Into<String>, name: impl Into<String>, source: Error) -> Self {
        Self::DiagnosticQuery {
            kind: kind.into(),
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Attach rendered diagnostics to a convergence error
    pub fn diagnosed(source: Error, events: impl Into<String>) -> Self {
        Self::Diagnosed {
            source: Box::new(source),
            events: events.into(),
        }
    }

    /// True when the remote object is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// HTTP status code associated with this error, if any
    ///
    /// `NotFound` reports 404 so callers that only care about the code do not
    /// need to special-case it.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::Transport { status, .. } => *status,
            Error::DiagnosticQuery { source, .. } => source.status_code(),
            Error::Diagnosed { source, .. } => source.status_code(),
            Error::MalformedIdentity { .. }
            | Error::ConvergenceTimeout { .. }
            | Error::ConvergenceFailed { .. }
            | Error::Validation { .. }
            | Error::Serialization { .. }
            | Error::Internal { .. } => None,
        }
    }

    /// True for errors raised by a convergence wait, diagnosed or not
    pub fn is_convergence(&self) -> bool {
        match self {
            Error::ConvergenceTimeout { .. } | Error::ConvergenceFailed { .. } => true,
            Error::Diagnosed { source, .. } => source.is_convergence(),
            _ => false,
        }
    }

    /// The phase reported by a convergence error, if any
    pub fn phase(&self) -> Option<&str> {
        match self {
            Error::ConvergenceTimeout { last_phase, .. } => last_phase.as_deref(),
            Error::ConvergenceFailed { phase, .. } => Some(phase),
            Error::Diagnosed { source, .. } => source.phase(),
            _ => None,
        }
    }
}
