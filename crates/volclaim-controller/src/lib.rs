//! Lifecycle controller for PersistentVolumeClaims
//!
//! Drives a claim from a desired manifest to a matching cluster object,
//! waits for it to bind, and explains failures with recent warning events.

#![deny(missing_docs)]

pub mod client;
pub mod clock;
pub mod controller;
pub mod diagnostics;
pub mod manifest;
pub mod patch;
pub mod quantity;
pub mod state;
pub mod translate;
pub mod wait;

pub use client::{ClaimApi, KubeClaimApi};
pub use clock::{Clock, TokioClock};
pub use controller::{ClaimController, ControllerConfig, Presence};
pub use manifest::ClaimManifest;
pub use state::{ClaimPhase, ClaimState, Lifecycle};
pub use wait::PollCadence;
