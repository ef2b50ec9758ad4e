use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pipewatch::engine::{Generation, LoopEvent, RawEvent, TransportEvent};
use pipewatch::transport::{Transport, TransportHandle, TransportSink};
use pipewatch::types::TransportMode;
use tokio::sync::mpsc;

/// Transport that replays a fixed list of events per start.
///
/// Each `start` takes the next script. Once a script is exhausted the
/// adapter stays open until stopped, like a quiet connection.
#[derive(Debug)]
pub struct ScriptedTransport {
    mode: TransportMode,
    scripts: VecDeque<Vec<TransportEvent>>,
    started: Arc<Mutex<Vec<Generation>>>,
}

impl ScriptedTransport {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            scripts: VecDeque::new(),
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the events delivered by the next `start`.
    pub fn script(mut self, events: Vec<TransportEvent>) -> Self {
        self.scripts.push_back(events);
        self
    }

    /// Generations this transport was started with, in order.
    pub fn started(&self) -> Arc<Mutex<Vec<Generation>>> {
        Arc::clone(&self.started)
    }
}

impl Transport for ScriptedTransport {
    fn mode(&self) -> TransportMode {
        self.mode
    }

    fn start(&mut self, generation: Generation, tx: mpsc::Sender<LoopEvent>) -> TransportHandle {
        self.started.lock().unwrap().push(generation);
        let script = self.scripts.pop_front().unwrap_or_default();
        let sink = TransportSink::new(generation, tx);

        let task = tokio::spawn(async move {
            for event in script {
                if !sink.send(event).await {
                    return;
                }
            }
            std::future::pending::<()>().await;
        });
        TransportHandle::new(generation, task)
    }
}

/// A live-stream line with no level.
pub fn line(message: &str) -> TransportEvent {
    TransportEvent::Raw(RawEvent::LogLine {
        message: message.to_string(),
        level: None,
    })
}

/// A live-stream line carrying a level.
pub fn line_at(level: &str, message: &str) -> TransportEvent {
    TransportEvent::Raw(RawEvent::LogLine {
        message: message.to_string(),
        level: Some(level.to_string()),
    })
}
