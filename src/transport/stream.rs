// src/transport/stream.rs

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Event, RequestBuilderExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::StreamMessage;
use crate::engine::{Generation, LoopEvent, RawEvent, TransportEvent};
use crate::errors::Result;
use crate::transport::{Transport, TransportHandle, TransportSink};
use crate::types::TransportMode;

/// Live-stream adapter over `GET /stream` server-sent events.
///
/// Each message is delivered as it arrives. The connection is never retried
/// here: any error or end of stream ends this generation with a fault and the
/// loop decides what to do next.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    client: Client,
    url: String,
}

impl StreamTransport {
    /// `connect_timeout` bounds connection setup only; the stream itself may
    /// stay open for the whole run.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        let url = format!("{}/stream", base_url.trim_end_matches('/'));
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for StreamTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Stream
    }

    fn start(&mut self, generation: Generation, sink: mpsc::Sender<LoopEvent>) -> TransportHandle {
        let request = self.client.get(&self.url);
        let sink = TransportSink::new(generation, sink);
        info!(generation, url = %self.url, "opening live event stream");
        let task = tokio::spawn(run_stream(request, sink));
        TransportHandle::new(generation, task)
    }
}

async fn run_stream(request: RequestBuilder, sink: TransportSink) {
    let mut source = match request.eventsource() {
        Ok(source) => source,
        Err(err) => {
            warn!(generation = sink.generation(), error = %err, "could not build event stream request");
            sink.send(TransportEvent::Terminal {
                fault: Some(format!("event stream setup failed: {err}")),
            })
            .await;
            return;
        }
    };

    while let Some(event) = source.next().await {
        match event {
            Ok(Event::Open) => {
                debug!(generation = sink.generation(), "event stream open");
                if !sink.send(TransportEvent::Connected).await {
                    source.close();
                    return;
                }
            }
            Ok(Event::Message(msg)) => {
                let StreamMessage { message, level } = StreamMessage::from_event_data(&msg.data);
                let raw = RawEvent::LogLine { message, level };
                if !sink.send(TransportEvent::Raw(raw)).await {
                    source.close();
                    return;
                }
            }
            Err(err) => {
                source.close();
                warn!(generation = sink.generation(), error = %err, "event stream failed");
                sink.send(TransportEvent::Terminal {
                    fault: Some(format!("event stream error: {err}")),
                })
                .await;
                return;
            }
        }
    }

    sink.send(TransportEvent::Terminal {
        fault: Some("event stream closed".to_string()),
    })
    .await;
}
