//! Common types for volclaim: errors, identities, and kube utilities

#![deny(missing_docs)]

pub mod error;
pub mod identity;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;
pub use identity::ClaimId;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Kind name of the managed resource
pub const CLAIM_KIND: &str = "PersistentVolumeClaim";

/// Kind name of the backing volume
pub const VOLUME_KIND: &str = "PersistentVolume";

/// Field manager / reporting component name used on API requests
pub const FIELD_MANAGER: &str = "volclaim";
