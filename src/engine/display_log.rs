// src/engine/display_log.rs

use std::collections::VecDeque;

/// Bounded buffer of log text shown next to the step list.
///
/// Live-stream lines are appended one by one; a polling tick replaces the
/// whole buffer with the backend's cumulative log.
#[derive(Debug, Clone)]
pub struct DisplayLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DisplayLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Replace the buffer with the tail of `content`.
    pub fn replace(&mut self, content: &str) {
        self.lines.clear();
        for line in content.lines() {
            self.push(line);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
