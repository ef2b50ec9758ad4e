// src/parse/live.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::{Parsed, Terminal};
use crate::steps::{StepStatus, Transition};

static EXECUTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Executing pipeline step:\s*(\S+)").expect("static regex is valid")
});

static COMPLETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SUCCESS: Completed step\s+(\S+)").expect("static regex is valid")
});

/// Parse one live-stream log line.
///
/// Checked in this order, first match wins:
/// 1. `Executing pipeline step: <module>` marks the module running.
/// 2. `SUCCESS: Completed step <module>` marks it finished.
/// 3. Level `ERROR` marks every running module failed and ends the run.
/// 4. Level `COMPLETE` ends the run successfully.
///
/// Anything else produces nothing; the text only belongs in the display log.
pub fn parse_log_line(message: &str, level: Option<&str>) -> Parsed {
    if let Some(module) = capture_module(&EXECUTING, message) {
        return Parsed::transition(Transition::set(module, StepStatus::Running));
    }

    if let Some(module) = capture_module(&COMPLETED, message) {
        return Parsed::transition(Transition::set(module, StepStatus::Finished));
    }

    match level.map(str::trim) {
        Some(lvl) if lvl.eq_ignore_ascii_case("ERROR") => Parsed {
            transitions: vec![Transition::MarkAllRunningAsFailed],
            terminal: Some(Terminal::Fatal(message.trim().to_string())),
        },
        Some(lvl) if lvl.eq_ignore_ascii_case("COMPLETE") => Parsed {
            transitions: Vec::new(),
            terminal: Some(Terminal::Completed),
        },
        _ => Parsed::nothing(),
    }
}

fn capture_module<'a>(re: &Regex, message: &'a str) -> Option<&'a str> {
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
