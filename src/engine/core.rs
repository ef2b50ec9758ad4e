// src/engine/core.rs

//! Pure core loop state machine.
//!
//! This module contains a synchronous, deterministic "core loop" that
//! consumes [`LoopEvent`]s and produces:
//! - an updated step state store (and display log)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the loop channel
//! - starting and stopping transport adapters
//! - issuing backend requests and feeding their replies back as events
//!
//! Every store mutation goes through this one `step` entry point, one event
//! at a time, so ordering needs no locks.

use crate::engine::event_handlers::{
    handle_bootstrap, handle_clear_requested, handle_history_cleared, handle_history_failed,
    handle_history_loaded, handle_run_accepted, handle_run_rejected, handle_run_requested,
    handle_shutdown, handle_transport_event, CoreCommand, CoreStep, LoopState,
};
use crate::engine::{DisplayLog, LoopEvent, LoopOptions, LoopPhase};
use crate::steps::{RunSnapshot, StepStateStore};

/// Pure core loop state.
///
/// This owns:
/// - the step state store
/// - the display log
/// - lifecycle bookkeeping (phase, generations, epochs)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreLoop {
    store: StepStateStore,
    log: DisplayLog,
    state: LoopState,
    options: LoopOptions,
}

impl CoreLoop {
    pub fn new(store: StepStateStore, options: LoopOptions) -> Self {
        Self {
            store,
            log: DisplayLog::new(options.log_capacity),
            state: LoopState::default(),
            options,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.phase
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &StepStateStore {
        &self.store
    }

    /// Mutable access for registering subscribers.
    pub fn store_mut(&mut self) -> &mut StepStateStore {
        &mut self.store
    }

    pub fn display_log(&self) -> &DisplayLog {
        &self.log
    }

    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    /// Whether the loop is idle with nothing outstanding (for tests).
    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    /// Commands to run once before the first event: the initial history load.
    pub fn bootstrap(&mut self) -> CoreStep {
        handle_bootstrap(&mut self.state)
    }

    /// Handle a single loop event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: LoopEvent) -> CoreStep {
        let mut step = match event {
            LoopEvent::RunRequested { start_step } => {
                handle_run_requested(&mut self.state, start_step)
            }
            LoopEvent::RunAccepted {
                epoch,
                start_step,
                message,
            } => handle_run_accepted(
                &mut self.state,
                &mut self.store,
                &mut self.log,
                &self.options,
                epoch,
                start_step,
                message,
            ),
            LoopEvent::RunRejected {
                epoch,
                start_step,
                message,
            } => handle_run_rejected(&mut self.state, &mut self.log, epoch, start_step, message),
            LoopEvent::Transport { generation, event } => handle_transport_event(
                &mut self.state,
                &mut self.store,
                &mut self.log,
                generation,
                event,
            ),
            LoopEvent::HistoryLoaded { epoch, completed } => {
                handle_history_loaded(&mut self.state, &mut self.store, epoch, completed)
            }
            LoopEvent::HistoryFailed { epoch, error } => {
                handle_history_failed(&mut self.state, epoch, error)
            }
            LoopEvent::ClearRequested => {
                handle_clear_requested(&mut self.state, &mut self.store, &mut self.log)
            }
            LoopEvent::HistoryCleared { outcome } => {
                handle_history_cleared(&mut self.state, outcome)
            }
            LoopEvent::ShutdownRequested => return handle_shutdown(&mut self.state),
        };

        // In `--once` mode, exit when nothing is left to wait for.
        if self.options.exit_when_idle && self.state.is_settled() {
            step.commands.push(CoreCommand::RequestExit);
            step.keep_running = false;
        }

        step
    }
}
