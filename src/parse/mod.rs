// src/parse/mod.rs

//! Event parsing.
//!
//! Both transports deliver raw text, but in different shapes:
//! - [`live`] handles one log line (plus optional severity level) at a time,
//!   as delivered by the server-sent event stream.
//! - [`blob`] handles the cumulative status blob returned by `GET /status`,
//!   re-parsed in full on every polling tick.
//!
//! Both reduce to a [`Parsed`] value: zero or more store [`Transition`]s and
//! an optional [`Terminal`] signal. Parsing never fails; unrecognised input
//! simply yields nothing.

pub mod blob;
pub mod live;

use crate::steps::Transition;

pub use blob::{contains_finished_marker, parse_status_blob, FINISHED_MARKER};
pub use live::parse_log_line;

/// Terminating signal recognised in the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// The pipeline reported successful completion.
    Completed,
    /// The pipeline reported a fatal error (carries the raw error text).
    Fatal(String),
}

/// Result of parsing one raw event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parsed {
    pub transitions: Vec<Transition>,
    pub terminal: Option<Terminal>,
}

impl Parsed {
    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn transition(transition: Transition) -> Self {
        Self {
            transitions: vec![transition],
            terminal: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.terminal.is_none()
    }
}
