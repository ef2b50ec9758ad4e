// src/render.rs

//! Terminal projection of a [`RunSnapshot`].
//!
//! Rendering is a pure function of the snapshot; the binary subscribes it to
//! the store and prints the result whenever it changes.

use std::fmt::Write;

use crate::steps::{RunSnapshot, RunStatus, StepStatus};

/// Glyph shown in front of a step.
pub fn status_glyph(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[ ]",
        StepStatus::Running => "[>]",
        StepStatus::Finished => "[x]",
        StepStatus::Failed => "[!]",
        StepStatus::Skipped => "[-]",
    }
}

/// Whether run controls should be enabled for this snapshot.
pub fn run_controls_enabled(snapshot: &RunSnapshot) -> bool {
    snapshot.run_status != RunStatus::Running
}

pub fn render_snapshot(snapshot: &RunSnapshot) -> String {
    let width = snapshot
        .steps
        .iter()
        .map(|s| s.module.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "pipeline: {}", snapshot.run_status);
    for step in &snapshot.steps {
        let _ = writeln!(
            out,
            "  {} {:<width$}  {}",
            status_glyph(step.status),
            step.module,
            step.status,
        );
    }
    if let Some(fault) = &snapshot.fault {
        let _ = writeln!(out, "fault: {fault}");
    }
    out
}
