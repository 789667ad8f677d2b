//! Stories about driving PersistentVolumeClaims through a real API server
//!
//! - `claim_lifecycle`: create with and without waiting, metadata updates,
//!   timeouts with diagnostics, idempotent delete and import

mod claim_lifecycle;
mod helpers;
