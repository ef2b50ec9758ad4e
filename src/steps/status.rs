// src/steps/status.rs

//! Step and run status values.

use std::fmt;

use crate::steps::ModuleName;

/// Status of a single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepStatus {
    /// Not started in the current run (initial state).
    #[default]
    Pending,
    /// The backend reported the step as executing.
    Running,
    /// The step completed successfully.
    Finished,
    /// The step was running when a fatal error was reported.
    Failed,
    /// The backend skipped the step.
    Skipped,
}

impl StepStatus {
    /// `Finished`, `Failed` and `Skipped` are terminal for the step: only a
    /// reset of the whole store may move a step out of them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Finished | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Finished => write!(f, "finished"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Aggregate status of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Finished,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Finished => write!(f, "finished"),
        }
    }
}

/// One `(module, status)` pair inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepState {
    pub module: ModuleName,
    pub status: StepStatus,
}

/// Ordered, read-only view of every registered module plus the derived run
/// status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSnapshot {
    pub steps: Vec<StepState>,
    pub run_status: RunStatus,
    /// Set when the run ended on a fatal error or a transport fault.
    pub fault: Option<String>,
}

impl RunSnapshot {
    /// Status of a module, or `None` if it is not registered.
    pub fn status_of(&self, module: &str) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|s| s.module == module)
            .map(|s| s.status)
    }

    /// Modules currently in the given status, in display order.
    pub fn modules_with(&self, status: StepStatus) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == status)
            .map(|s| s.module.as_str())
            .collect()
    }
}
