// src/transport/poll.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::engine::{Generation, LoopEvent, RawEvent, TransportEvent};
use crate::parse::contains_finished_marker;
use crate::transport::{Transport, TransportHandle, TransportSink};
use crate::types::TransportMode;

/// Polling adapter: fetch the cumulative status blob every `interval`.
///
/// Fail-stop: a failed request ends the generation with a fault instead of
/// retrying. The adapter also stops itself once the blob contains the
/// finished marker.
pub struct PollTransport<B: Backend> {
    backend: Arc<B>,
    interval: Duration,
}

impl<B: Backend> fmt::Debug for PollTransport<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollTransport")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> PollTransport<B> {
    pub fn new(backend: Arc<B>, interval: Duration) -> Self {
        Self { backend, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<B: Backend> Transport for PollTransport<B> {
    fn mode(&self) -> TransportMode {
        TransportMode::Poll
    }

    fn start(&mut self, generation: Generation, sink: mpsc::Sender<LoopEvent>) -> TransportHandle {
        let backend = Arc::clone(&self.backend);
        let sink = TransportSink::new(generation, sink);
        info!(generation, interval = ?self.interval, "starting status polling");
        let task = tokio::spawn(run_poll(backend, self.interval, sink));
        TransportHandle::new(generation, task)
    }
}

async fn run_poll<B: Backend>(backend: Arc<B>, interval: Duration, sink: TransportSink) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let report = match backend.fetch_status().await {
            Ok(report) => report,
            Err(err) => {
                warn!(generation = sink.generation(), error = %err, "status request failed; stopping poller");
                sink.send(TransportEvent::Terminal {
                    fault: Some(format!("status request failed: {err}")),
                })
                .await;
                return;
            }
        };

        let finished = contains_finished_marker(&report.status_content);
        debug!(generation = sink.generation(), finished, "status tick");

        if !sink.send(TransportEvent::Raw(RawEvent::StatusBlob(report))).await {
            return;
        }

        if finished {
            info!(generation = sink.generation(), "status blob reports pipeline finished; stopping poller");
            sink.send(TransportEvent::Terminal { fault: None }).await;
            return;
        }
    }
}
