// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::{Backend, RunAck};
use crate::errors::Result;
use crate::transport::{Transport, TransportHandle};

use super::core::CoreLoop;
use super::{CoreCommand, Epoch, Generation, LoopEvent};

/// Drives the core loop in response to `LoopEvent`s and carries out the
/// commands it returns.
///
/// This is a pure IO shell around `CoreLoop`, which contains all the
/// reconciliation semantics. This struct handles async IO: reading events
/// from the channel, owning the active transport handle, and issuing backend
/// requests whose replies come back through the same channel.
pub struct Runtime<T: Transport, B: Backend> {
    core: CoreLoop,
    event_rx: mpsc::Receiver<LoopEvent>,
    event_tx: mpsc::Sender<LoopEvent>,
    transport: T,
    backend: Arc<B>,
    active: Option<TransportHandle>,
}

impl<T: Transport, B: Backend> fmt::Debug for Runtime<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, B: Backend> Runtime<T, B> {
    /// `event_tx` must feed `event_rx`; the runtime uses it to hand to
    /// adapters and to post backend replies.
    pub fn new(
        core: CoreLoop,
        event_tx: mpsc::Sender<LoopEvent>,
        event_rx: mpsc::Receiver<LoopEvent>,
        transport: T,
        backend: Arc<B>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            transport,
            backend,
            active: None,
        }
    }

    /// Main event loop.
    ///
    /// - Runs the bootstrap commands (initial history load).
    /// - Consumes `LoopEvent`s from `event_rx`.
    /// - Feeds them into the core loop.
    /// - Executes commands returned by the core.
    ///
    /// Returns the core so callers can inspect the final state.
    pub async fn run(mut self) -> Result<CoreLoop> {
        info!(transport = %self.transport.mode(), "pipewatch loop started");

        let bootstrap = self.core.bootstrap();
        for command in bootstrap.commands {
            self.execute_command(command);
        }

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("loop event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "loop received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping loop");
                break;
            }
        }

        if let Some(handle) = self.active.take() {
            handle.stop();
        }

        info!("loop exiting");
        Ok(self.core)
    }

    /// Execute a single command from the core.
    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::SubmitRun { epoch, start_step } => self.submit_run(epoch, start_step),
            CoreCommand::StartTransport { generation } => self.start_transport(generation),
            CoreCommand::StopTransport { generation } => self.stop_transport(generation),
            CoreCommand::RefreshHistory { epoch } => self.refresh_history(epoch),
            CoreCommand::ClearBackendHistory => self.clear_history(),
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
    }

    fn start_transport(&mut self, generation: Generation) {
        if let Some(previous) = self.active.take() {
            previous.stop();
        }
        let handle = self.transport.start(generation, self.event_tx.clone());
        self.active = Some(handle);
    }

    fn stop_transport(&mut self, generation: Generation) {
        match self.active.take() {
            Some(handle) if handle.generation() == generation => handle.stop(),
            Some(other) => {
                debug!(
                    generation,
                    active = other.generation(),
                    "stop requested for a transport that is no longer active"
                );
                self.active = Some(other);
            }
            None => {}
        }
    }

    fn submit_run(&self, epoch: Epoch, start_step: String) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let ack = backend.start_run(&start_step).await;
            let event = match ack {
                Ok(RunAck::Accepted(message)) => LoopEvent::RunAccepted {
                    epoch,
                    start_step,
                    message,
                },
                Ok(RunAck::Rejected(message)) => LoopEvent::RunRejected {
                    epoch,
                    start_step,
                    message,
                },
                Err(err) => LoopEvent::RunRejected {
                    epoch,
                    start_step,
                    message: format!("run request failed: {err}"),
                },
            };
            let _ = tx.send(event).await;
        });
    }

    fn refresh_history(&self, epoch: Epoch) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match backend.fetch_history().await {
                Ok(completed) => LoopEvent::HistoryLoaded { epoch, completed },
                Err(err) => LoopEvent::HistoryFailed {
                    epoch,
                    error: err.to_string(),
                },
            };
            let _ = tx.send(event).await;
        });
    }

    fn clear_history(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.clear_history().await.map_err(|e| e.to_string());
            let _ = tx.send(LoopEvent::HistoryCleared { outcome }).await;
        });
    }
}
