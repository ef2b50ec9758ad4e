// src/transport/mod.rs

//! Transport adapters.
//!
//! Two interchangeable sources of raw events sit behind [`Transport`]:
//! - [`stream`]: server-sent events from `GET /stream`, one log line per
//!   message, in backend emission order.
//! - [`poll`]: re-fetches the cumulative `GET /status` blob on a fixed
//!   interval and stops itself once the blob carries the finished marker or a
//!   request fails.
//!
//! An adapter never touches the store. It forwards everything into the loop
//! channel tagged with the generation it was started under, and the loop
//! drops anything from a generation it has since stopped.

pub mod poll;
pub mod stream;

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::backend::HttpBackend;
use crate::engine::{Generation, LoopEvent, TransportEvent};
use crate::types::TransportMode;

pub use poll::PollTransport;
pub use stream::StreamTransport;

/// Trait abstracting where raw events come from.
///
/// Production code uses [`AnyTransport`]; tests can provide a scripted
/// implementation that never opens a connection.
pub trait Transport: Send {
    fn mode(&self) -> TransportMode;

    /// Start delivering events for `generation` into `sink`.
    fn start(&mut self, generation: Generation, sink: mpsc::Sender<LoopEvent>) -> TransportHandle;
}

/// Handle to a running adapter. Stopping it aborts the adapter task.
pub struct TransportHandle {
    generation: Generation,
    task: JoinHandle<()>,
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("generation", &self.generation)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl TransportHandle {
    pub fn new(generation: Generation, task: JoinHandle<()>) -> Self {
        Self { generation, task }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the adapter task. Anything it already queued is dropped by the
    /// loop's generation check.
    pub fn stop(self) {
        debug!(generation = self.generation, "stopping transport adapter");
        self.task.abort();
    }
}

/// Sender half used by adapters: tags every event with its generation.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: Generation,
    tx: mpsc::Sender<LoopEvent>,
}

impl TransportSink {
    pub fn new(generation: Generation, tx: mpsc::Sender<LoopEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Forward one event. Returns `false` once the loop has gone away.
    pub async fn send(&self, event: TransportEvent) -> bool {
        self.tx
            .send(LoopEvent::Transport {
                generation: self.generation,
                event,
            })
            .await
            .is_ok()
    }
}

/// The transport chosen for this deployment.
#[derive(Debug)]
pub enum AnyTransport {
    Stream(StreamTransport),
    Poll(PollTransport<HttpBackend>),
}

impl AnyTransport {
    /// Build the adapter for `mode` against the given backend.
    pub fn for_mode(
        mode: TransportMode,
        backend: Arc<HttpBackend>,
        poll_interval: std::time::Duration,
        connect_timeout: std::time::Duration,
    ) -> crate::errors::Result<Self> {
        Ok(match mode {
            TransportMode::Stream => {
                AnyTransport::Stream(StreamTransport::new(backend.base_url(), connect_timeout)?)
            }
            TransportMode::Poll => AnyTransport::Poll(PollTransport::new(backend, poll_interval)),
        })
    }
}

impl Transport for AnyTransport {
    fn mode(&self) -> TransportMode {
        match self {
            AnyTransport::Stream(t) => t.mode(),
            AnyTransport::Poll(t) => t.mode(),
        }
    }

    fn start(&mut self, generation: Generation, sink: mpsc::Sender<LoopEvent>) -> TransportHandle {
        match self {
            AnyTransport::Stream(t) => t.start(generation, sink),
            AnyTransport::Poll(t) => t.start(generation, sink),
        }
    }
}
