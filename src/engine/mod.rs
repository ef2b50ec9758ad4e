// src/engine/mod.rs

//! Reconciliation loop.
//!
//! This module ties together:
//! - the step state store (single source of truth for step status)
//! - the event parsers
//! - the transport adapter lifecycle (start / stop / discard stale events)
//! - the authoritative history refresh once a run is over
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::backend::StatusReport;
use crate::steps::ModuleName;
use crate::types::TransportMode;

/// Identifies one adapter start. Events tagged with any other generation
/// than the active one are dropped.
pub type Generation = u64;

/// Bumped on every store reset. Replies to requests issued under an older
/// epoch are dropped.
pub type Epoch = u64;

/// Phase of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// No run in flight.
    #[default]
    Idle,
    /// Run accepted, transport started, waiting for it to connect.
    Starting,
    /// Transport delivering events.
    Active,
    /// Terminal signal seen, waiting for the authoritative refresh.
    Finishing,
}

/// One raw payload from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// A single line from the live stream.
    LogLine {
        message: String,
        level: Option<String>,
    },
    /// The full cumulative blob from one polling tick.
    StatusBlob(StatusReport),
}

/// What a transport adapter reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open (only for transports that know this).
    Connected,
    Raw(RawEvent),
    /// The adapter stopped itself; `fault` is set for connection drops and
    /// failed requests.
    Terminal { fault: Option<String> },
}

/// Events flowing into the loop from the user, transports and backend
/// replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// The user asked to run the pipeline from `start_step`.
    RunRequested { start_step: ModuleName },
    /// The backend accepted a run submitted under `epoch`.
    RunAccepted {
        epoch: Epoch,
        start_step: ModuleName,
        message: String,
    },
    /// The backend refused (or could not be asked about) a run.
    RunRejected {
        epoch: Epoch,
        start_step: ModuleName,
        message: String,
    },
    /// Something arrived from the adapter started as `generation`.
    Transport {
        generation: Generation,
        event: TransportEvent,
    },
    /// `GET /history` answered.
    HistoryLoaded {
        epoch: Epoch,
        completed: Vec<ModuleName>,
    },
    /// `GET /history` failed.
    HistoryFailed { epoch: Epoch, error: String },
    /// The user cleared the run history.
    ClearRequested,
    /// `POST /history` answered (`Err` carries the failure text).
    HistoryCleared { outcome: Result<String, String> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub transport: TransportMode,
    /// Exit once the loop is idle with nothing outstanding (`--once`).
    pub exit_when_idle: bool,
    /// Maximum number of lines kept in the display log.
    pub log_capacity: usize,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            exit_when_idle: false,
            log_capacity: 1000,
        }
    }
}

pub mod core;
pub mod display_log;
pub mod event_handlers;
pub mod runtime;

pub use self::core::CoreLoop;
pub use display_log::DisplayLog;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
