use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pipewatch::backend::{Backend, BackendConfig, BackendFuture, RunAck, StatusReport};
use pipewatch::errors::PipewatchError;
use pipewatch::steps::ModuleName;

/// Scripted answers and recorded calls of a [`FakeBackend`].
#[derive(Debug, Default)]
pub struct FakeBackendState {
    /// Answer to every `start_run`. Accepts when `None`.
    pub run_ack: Option<RunAck>,
    /// Completed modules reported by `fetch_history`.
    pub history: Vec<ModuleName>,
    /// Delay before `fetch_history` answers.
    pub history_delay: Option<Duration>,
    /// Successive `fetch_status` answers; the last one repeats.
    pub statuses: VecDeque<StatusReport>,
    /// When set, `fetch_status` fails with this message.
    pub status_error: Option<String>,
    pub config: BackendConfig,

    pub run_requests: Vec<String>,
    pub history_fetches: usize,
    pub history_clears: usize,
    pub status_fetches: usize,
    pub saved_configs: Vec<BackendConfig>,
}

/// In-memory backend for engine tests.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, completed: &[&str]) -> Self {
        self.state().history = completed.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn rejecting_runs(self, message: &str) -> Self {
        self.state().run_ack = Some(RunAck::Rejected(message.to_string()));
        self
    }

    pub fn with_history_delay(self, delay: Duration) -> Self {
        self.state().history_delay = Some(delay);
        self
    }

    pub fn push_status(&self, log_content: &str, status_content: &str) {
        self.state().statuses.push_back(StatusReport {
            log_content: log_content.to_string(),
            status_content: status_content.to_string(),
        });
    }

    pub fn fail_status(&self, message: &str) {
        self.state().status_error = Some(message.to_string());
    }

    /// Lock the shared state to script answers or inspect recorded calls.
    pub fn state(&self) -> MutexGuard<'_, FakeBackendState> {
        self.state.lock().unwrap()
    }
}

impl Backend for FakeBackend {
    fn start_run<'a>(&'a self, start_step: &'a str) -> BackendFuture<'a, RunAck> {
        Box::pin(async move {
            let mut state = self.state();
            state.run_requests.push(start_step.to_string());
            Ok(state
                .run_ack
                .clone()
                .unwrap_or_else(|| RunAck::Accepted(format!("Pipeline started from {start_step}"))))
        })
    }

    fn fetch_status(&self) -> BackendFuture<'_, StatusReport> {
        Box::pin(async move {
            let mut state = self.state();
            state.status_fetches += 1;
            if let Some(message) = &state.status_error {
                return Err(PipewatchError::Backend {
                    status: 500,
                    message: message.clone(),
                });
            }
            let report = if state.statuses.len() > 1 {
                state.statuses.pop_front().unwrap_or_default()
            } else {
                state.statuses.front().cloned().unwrap_or_default()
            };
            Ok(report)
        })
    }

    fn fetch_history(&self) -> BackendFuture<'_, Vec<ModuleName>> {
        Box::pin(async move {
            let delay = {
                let mut state = self.state();
                state.history_fetches += 1;
                state.history_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.state().history.clone())
        })
    }

    fn clear_history(&self) -> BackendFuture<'_, String> {
        Box::pin(async move {
            let mut state = self.state();
            state.history_clears += 1;
            state.history.clear();
            Ok("History cleared".to_string())
        })
    }

    fn fetch_config(&self) -> BackendFuture<'_, BackendConfig> {
        Box::pin(async move { Ok(self.state().config.clone()) })
    }

    fn save_config<'a>(&'a self, config: &'a BackendConfig) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.state();
            state.config = config.clone();
            state.saved_configs.push(config.clone());
            Ok("Configuration saved".to_string())
        })
    }
}
