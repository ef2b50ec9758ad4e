// src/steps/store.rs

//! The step state store.
//!
//! This is the only place step status lives. It performs no IO and knows
//! nothing about transports: it is a deterministic reducer over
//! [`Transition`]s. Every mutation (including a redundant one) notifies all
//! subscribers synchronously with the resulting [`RunSnapshot`], so a
//! renderer can never fall out of step with the store.

use std::fmt;

use tracing::{debug, trace};

use crate::steps::{
    ModuleName, RunSnapshot, RunStatus, StepRegistry, StepState, StepStatus, Transition,
};

/// Token returned by [`StepStateStore::subscribe`]; pass it to
/// [`StepStateStore::unsubscribe`] to stop receiving snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&RunSnapshot) + Send>;

pub struct StepStateStore {
    registry: StepRegistry,
    /// Parallel to `registry.list()`.
    statuses: Vec<StepStatus>,
    run_started: bool,
    run_finished: bool,
    fault: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for StepStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepStateStore")
            .field("registry", &self.registry)
            .field("statuses", &self.statuses)
            .field("run_started", &self.run_started)
            .field("run_finished", &self.run_finished)
            .field("fault", &self.fault)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StepStateStore {
    /// All modules `Pending`, run status idle, no subscribers.
    pub fn new(registry: StepRegistry) -> Self {
        let statuses = vec![StepStatus::Pending; registry.len()];
        Self {
            registry,
            statuses,
            run_started: false,
            run_finished: false,
            fault: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Back to the initial state, then notify.
    pub fn reset(&mut self) {
        self.reset_inner();
        self.notify();
    }

    /// Apply one transition and notify subscribers.
    ///
    /// Returns whether anything changed. Unknown modules and redundant
    /// transitions are no-ops, but subscribers are still notified.
    pub fn apply(&mut self, transition: Transition) -> bool {
        let changed = self.apply_inner(transition);
        self.notify();
        changed
    }

    /// Apply a sequence of transitions in order and notify once at the end.
    ///
    /// Used for the polling transport, where a whole cumulative blob is
    /// re-derived every tick.
    pub fn apply_batch<I>(&mut self, transitions: I) -> bool
    where
        I: IntoIterator<Item = Transition>,
    {
        let mut changed = false;
        for transition in transitions {
            changed |= self.apply_inner(transition);
        }
        self.notify();
        changed
    }

    /// Current read-only view.
    pub fn snapshot(&self) -> RunSnapshot {
        let steps = self
            .registry
            .list()
            .iter()
            .zip(self.statuses.iter())
            .map(|(module, status)| StepState {
                module: module.clone(),
                status: *status,
            })
            .collect();

        RunSnapshot {
            steps,
            run_status: self.run_status(),
            fault: self.fault.clone(),
        }
    }

    pub fn status_of(&self, module: &str) -> Option<StepStatus> {
        self.registry.position(module).map(|i| self.statuses[i])
    }

    pub fn run_status(&self) -> RunStatus {
        if self.run_finished {
            RunStatus::Finished
        } else if self.run_started || self.statuses.contains(&StepStatus::Running) {
            RunStatus::Running
        } else {
            RunStatus::Idle
        }
    }

    /// Register a listener invoked synchronously after every mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&RunSnapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        trace!(listeners = self.listeners.len(), run_status = %snapshot.run_status, "notifying subscribers");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&snapshot);
        }
    }

    fn reset_inner(&mut self) {
        self.statuses.fill(StepStatus::Pending);
        self.run_started = false;
        self.run_finished = false;
        self.fault = None;
        debug!("step state store reset");
    }

    fn apply_inner(&mut self, transition: Transition) -> bool {
        match transition {
            Transition::SetStatus { module, status } => self.set_status(&module, status),
            Transition::ResetAll => {
                let before = self.snapshot();
                self.reset_inner();
                before != self.snapshot()
            }
            Transition::MarkAllRunningAsFailed => self.mark_all_running_failed(),
            Transition::RunStarted => {
                let changed = !self.run_started || self.run_finished || self.fault.is_some();
                self.run_started = true;
                self.run_finished = false;
                self.fault = None;
                changed
            }
            Transition::RunFinished { fault } => {
                let mut changed = !self.run_finished;
                self.run_finished = true;
                if fault.is_some() && fault != self.fault {
                    self.fault = fault;
                    changed = true;
                }
                changed
            }
            Transition::SyncCompleted { modules } => self.sync_completed(&modules),
        }
    }

    fn set_status(&mut self, module: &str, status: StepStatus) -> bool {
        let Some(idx) = self.registry.position(module) else {
            debug!(module, %status, "ignoring transition for unknown module");
            return false;
        };

        let current = self.statuses[idx];
        if current == status {
            return false;
        }

        if current.is_terminal() && !status.is_terminal() {
            debug!(
                module,
                current = %current,
                requested = %status,
                "refusing to move terminal step back to a non-terminal status"
            );
            return false;
        }

        debug!(module, from = %current, to = %status, "step transition");
        self.statuses[idx] = status;
        true
    }

    fn mark_all_running_failed(&mut self) -> bool {
        let mut changed = false;
        for (module, status) in self.registry.list().iter().zip(self.statuses.iter_mut()) {
            if *status == StepStatus::Running {
                debug!(module = %module, "marking running step as failed");
                *status = StepStatus::Failed;
                changed = true;
            }
        }
        changed
    }

    fn sync_completed(&mut self, completed: &[ModuleName]) -> bool {
        let mut changed = false;

        for (i, module) in self.registry.list().iter().enumerate() {
            let recorded = completed.iter().any(|c| c == module);
            let status = &mut self.statuses[i];

            if recorded && *status != StepStatus::Finished {
                debug!(module = %module, from = %status, "history records step as finished");
                *status = StepStatus::Finished;
                changed = true;
            } else if !recorded && *status == StepStatus::Running {
                debug!(module = %module, "history has no record of running step; back to pending");
                *status = StepStatus::Pending;
                changed = true;
            }
        }

        for module in completed {
            if !self.registry.contains(module) {
                debug!(module = %module, "history names unknown module; ignored");
            }
        }

        changed
    }
}
