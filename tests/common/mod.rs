#![allow(dead_code)]

pub use pipewatch_test_utils::builders;
pub use pipewatch_test_utils::fake_backend::FakeBackend;
pub use pipewatch_test_utils::scripted_transport::{line, line_at, ScriptedTransport};
pub use pipewatch_test_utils::{init_tracing, record_snapshots, with_timeout};

use pipewatch::steps::{RunSnapshot, StepStatus};

/// Every module except those listed is `Pending`.
pub fn assert_only(snapshot: &RunSnapshot, expected: &[(&str, StepStatus)]) {
    for step in &snapshot.steps {
        let want = expected
            .iter()
            .find(|(m, _)| *m == step.module)
            .map(|(_, s)| *s)
            .unwrap_or(StepStatus::Pending);
        assert_eq!(
            step.status, want,
            "module {} is {} but expected {}",
            step.module, step.status, want
        );
    }
}
