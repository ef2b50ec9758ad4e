// src/steps/mod.rs

//! Step bookkeeping: what modules exist and what state each one is in.
//!
//! - [`registry`] holds the fixed, ordered list of known pipeline modules.
//! - [`status`] defines per-step and per-run status values plus the
//!   read-only [`RunSnapshot`] handed to renderers.
//! - [`transition`] is the instruction vocabulary produced by the parsers.
//! - [`store`] is the single mutable source of truth: a deterministic
//!   reducer over transitions that notifies subscribers after every mutation.

/// Canonical module identifier type used throughout the crate.
pub type ModuleName = String;

pub mod registry;
pub mod status;
pub mod store;
pub mod transition;

pub use registry::StepRegistry;
pub use status::{RunSnapshot, RunStatus, StepState, StepStatus};
pub use store::{StepStateStore, SubscriptionId};
pub use transition::Transition;
