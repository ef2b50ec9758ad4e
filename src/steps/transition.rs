// src/steps/transition.rs

use crate::steps::{ModuleName, StepStatus};

/// A single instruction for the step state store.
///
/// Parsers reduce both transports to this vocabulary, so the store and any
/// renderer never need to know where an event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move one module to a new status.
    SetStatus {
        module: ModuleName,
        status: StepStatus,
    },
    /// Every module back to `Pending`, run status back to idle.
    ResetAll,
    /// Every module currently `Running` becomes `Failed`; nothing else moves.
    ///
    /// The backend's error lines do not name the failing step, so this is the
    /// best attribution available.
    MarkAllRunningAsFailed,
    /// A run was accepted by the backend and is now in flight.
    RunStarted,
    /// A terminating signal was observed; `fault` carries the reason when the
    /// run ended badly.
    RunFinished { fault: Option<String> },
    /// Authoritative record of completed modules from the backend history.
    ///
    /// Listed modules become `Finished`; modules still `Running` that the
    /// backend did not record go back to `Pending`; other states are kept.
    SyncCompleted { modules: Vec<ModuleName> },
}

impl Transition {
    pub fn set(module: impl Into<ModuleName>, status: StepStatus) -> Self {
        Transition::SetStatus {
            module: module.into(),
            status,
        }
    }
}
