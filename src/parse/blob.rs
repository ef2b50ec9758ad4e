// src/parse/blob.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::{Parsed, Terminal};
use crate::steps::{StepStatus, Transition};

/// Line the backend appends to the status blob once the pipeline is done.
pub const FINISHED_MARKER: &str = "INFO: Pipeline finished.";

// Accepts both `STATUS <module> <token>` and `STATUS: <module> <token>`.
static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^STATUS:?\s+(\S+)\s+(\S+)$").expect("static regex is valid")
});

/// Parse the full cumulative status blob.
///
/// Every recognised `STATUS` line becomes a transition, in blob order; the
/// caller applies them as one batch. Because the blob is cumulative, applying
/// the same blob again re-derives the same state.
pub fn parse_status_blob(blob: &str) -> Parsed {
    let mut parsed = Parsed::nothing();

    for line in blob.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == FINISHED_MARKER {
            parsed.terminal = Some(Terminal::Completed);
            continue;
        }

        if let Some(transition) = parse_status_line(line) {
            parsed.transitions.push(transition);
        }
    }

    parsed
}

/// Whether the blob already contains the finished marker.
pub fn contains_finished_marker(blob: &str) -> bool {
    blob.lines().any(|line| line.trim() == FINISHED_MARKER)
}

fn parse_status_line(line: &str) -> Option<Transition> {
    let caps = STATUS_LINE.captures(line)?;
    let module = caps.get(1)?.as_str();
    let status = status_from_token(caps.get(2)?.as_str())?;
    Some(Transition::set(module, status))
}

fn status_from_token(token: &str) -> Option<StepStatus> {
    match token {
        "in_progress" => Some(StepStatus::Running),
        "finished" => Some(StepStatus::Finished),
        "skipped" => Some(StepStatus::Skipped),
        _ => None,
    }
}
