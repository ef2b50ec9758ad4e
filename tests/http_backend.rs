// tests/http_backend.rs
mod common;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::common::builders::bulk_store;
use crate::common::{assert_only, init_tracing, with_timeout};

use pipewatch::backend::{
    Backend, BackendConfig, HttpBackend, MessageResponse, RunAck, RunRequest, StatusReport,
    StreamMessage,
};
use pipewatch::engine::{CoreLoop, LoopEvent, LoopOptions, RawEvent, Runtime, TransportEvent};
use pipewatch::errors::PipewatchError;
use pipewatch::parse::FINISHED_MARKER;
use pipewatch::steps::{RunStatus, StepStatus};
use pipewatch::transport::{AnyTransport, PollTransport, StreamTransport, Transport};
use pipewatch::types::TransportMode;

type TestResult = anyhow::Result<()>;

#[derive(Default)]
struct ServerState {
    busy: bool,
    runs: Vec<String>,
    history: Vec<String>,
    history_broken: bool,
    config: BackendConfig,
    stream: Vec<StreamMessage>,
}

type Shared = Arc<Mutex<ServerState>>;

async fn handle_run(
    State(state): State<Shared>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    if state.busy {
        return (
            StatusCode::CONFLICT,
            Json(MessageResponse {
                message: None,
                error: Some("Pipeline is already running".to_string()),
            }),
        );
    }
    state.runs.push(request.start_step.clone());
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: Some(format!("Pipeline started from {}", request.start_step)),
            error: None,
        }),
    )
}

async fn handle_status() -> Json<StatusReport> {
    Json(StatusReport {
        log_content: "INFO: Executing pipeline step: qc_raw_fastq\n".to_string(),
        status_content: format!("STATUS qc_raw_fastq finished\n{FINISHED_MARKER}\n"),
    })
}

async fn handle_history(State(state): State<Shared>) -> impl IntoResponse {
    let state = state.lock().unwrap();
    if state.history_broken {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "history file unreadable" })),
        );
    }
    (StatusCode::OK, Json(serde_json::json!(state.history)))
}

async fn handle_clear_history(State(state): State<Shared>) -> Json<MessageResponse> {
    state.lock().unwrap().history.clear();
    Json(MessageResponse {
        message: Some("History cleared".to_string()),
        error: None,
    })
}

async fn handle_get_config(State(state): State<Shared>) -> Json<BackendConfig> {
    Json(state.lock().unwrap().config.clone())
}

async fn handle_save_config(
    State(state): State<Shared>,
    Json(config): Json<BackendConfig>,
) -> Json<MessageResponse> {
    state.lock().unwrap().config = config;
    Json(MessageResponse {
        message: Some("Configuration saved".to_string()),
        error: None,
    })
}

async fn handle_stream(
    State(state): State<Shared>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let messages = state.lock().unwrap().stream.clone();
    let mut events: Vec<Result<Event, Infallible>> = messages
        .iter()
        .map(|m| Ok(Event::default().data(serde_json::to_string(m).unwrap())))
        .collect();
    events.push(Ok(Event::default().data("not json at all")));
    Sse::new(futures::stream::iter(events))
}

async fn spawn_backend(state: ServerState) -> anyhow::Result<(String, Shared)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let shared: Shared = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/run", axum::routing::post(handle_run))
        .route("/status", get(handle_status))
        .route("/history", get(handle_history).post(handle_clear_history))
        .route("/config", get(handle_get_config).post(handle_save_config))
        .route("/stream", get(handle_stream))
        .with_state(Arc::clone(&shared));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), shared))
}

fn client() -> Client {
    Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("client builds")
}

fn stream_client() -> Client {
    Client::builder()
        .no_proxy()
        .connect_timeout(Duration::from_secs(2))
        .build()
        .expect("client builds")
}

fn msg(message: &str, level: &str) -> StreamMessage {
    StreamMessage {
        message: message.to_string(),
        level: Some(level.to_string()),
    }
}

#[tokio::test]
async fn run_request_is_accepted_or_rejected() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, shared) = spawn_backend(ServerState::default()).await?;
        let backend = HttpBackend::with_client(client(), format!("{url}/"));

        let ack = backend.start_run("trim_fastq").await?;
        assert_eq!(
            ack,
            RunAck::Accepted("Pipeline started from trim_fastq".to_string())
        );
        assert_eq!(shared.lock().unwrap().runs, vec!["trim_fastq".to_string()]);

        shared.lock().unwrap().busy = true;
        let ack = backend.start_run("trim_fastq").await?;
        assert_eq!(
            ack,
            RunAck::Rejected("Pipeline is already running".to_string())
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn history_round_trip_and_server_errors() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, shared) = spawn_backend(ServerState {
            history: vec!["qc_raw_fastq".to_string(), "trim_fastq".to_string()],
            ..ServerState::default()
        })
        .await?;
        let backend = HttpBackend::with_client(client(), url);

        assert_eq!(
            backend.fetch_history().await?,
            vec!["qc_raw_fastq".to_string(), "trim_fastq".to_string()]
        );
        assert_eq!(backend.clear_history().await?, "History cleared");
        assert!(backend.fetch_history().await?.is_empty());

        shared.lock().unwrap().history_broken = true;
        match backend.fetch_history().await {
            Err(PipewatchError::Backend { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "history file unreadable");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn status_and_config_endpoints() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, shared) = spawn_backend(ServerState::default()).await?;
        let backend = HttpBackend::with_client(client(), url);

        let report = backend.fetch_status().await?;
        assert!(report.status_content.contains(FINISHED_MARKER));

        let mut config = backend.fetch_config().await?;
        assert!(config.is_empty());
        config.insert("threads".to_string(), serde_json::json!(8));
        assert_eq!(backend.save_config(&config).await?, "Configuration saved");
        assert_eq!(
            shared.lock().unwrap().config.get("threads"),
            Some(&serde_json::json!(8))
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unreachable_backend_is_an_http_error() -> TestResult {
    with_timeout(async {
        init_tracing();
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let backend = HttpBackend::with_client(client(), format!("http://{addr}"));
        assert!(matches!(
            backend.fetch_status().await,
            Err(PipewatchError::Http(_))
        ));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn stream_transport_forwards_lines_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, _shared) = spawn_backend(ServerState {
            stream: vec![
                msg("Executing pipeline step: qc_raw_fastq", "INFO"),
                msg("SUCCESS: Completed step qc_raw_fastq", "INFO"),
            ],
            ..ServerState::default()
        })
        .await?;

        let mut transport = StreamTransport::with_client(stream_client(), &url);
        assert_eq!(transport.url(), format!("{url}/stream"));

        let (tx, mut rx) = mpsc::channel(16);
        let handle = transport.start(7, tx);

        let mut events = Vec::new();
        while let Some(LoopEvent::Transport { generation, event }) = rx.recv().await {
            assert_eq!(generation, 7);
            let terminal = matches!(event, TransportEvent::Terminal { .. });
            events.push(event);
            if terminal {
                break;
            }
        }
        handle.stop();

        assert_eq!(events[0], TransportEvent::Connected);
        assert_eq!(
            events[1],
            TransportEvent::Raw(RawEvent::LogLine {
                message: "Executing pipeline step: qc_raw_fastq".to_string(),
                level: Some("INFO".to_string()),
            })
        );
        assert_eq!(
            events[3],
            TransportEvent::Raw(RawEvent::LogLine {
                message: "not json at all".to_string(),
                level: None,
            })
        );
        // The server closing the stream is a fault from the adapter's side.
        assert!(matches!(
            events.last(),
            Some(TransportEvent::Terminal { fault: Some(_) })
        ));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn live_run_over_http_settles_on_history() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, shared) = spawn_backend(ServerState {
            history: vec!["qc_raw_fastq".to_string()],
            stream: vec![
                msg("Executing pipeline step: qc_raw_fastq", "INFO"),
                msg("SUCCESS: Completed step qc_raw_fastq", "INFO"),
                msg("Executing pipeline step: detect_adapters", "INFO"),
                msg("adapter detection crashed", "ERROR"),
            ],
            ..ServerState::default()
        })
        .await?;

        let backend = Arc::new(HttpBackend::with_client(client(), url.clone()));
        let transport = StreamTransport::with_client(stream_client(), &url);

        let (tx, rx) = mpsc::channel(64);
        tx.send(LoopEvent::RunRequested {
            start_step: "qc_raw_fastq".to_string(),
        })
        .await?;
        let options = LoopOptions {
            transport: TransportMode::Stream,
            exit_when_idle: true,
            ..LoopOptions::default()
        };
        let core = CoreLoop::new(bulk_store(), options);
        let core = Runtime::new(core, tx, rx, transport, backend).run().await?;

        let snapshot = core.snapshot();
        assert_only(
            &snapshot,
            &[
                ("qc_raw_fastq", StepStatus::Finished),
                ("detect_adapters", StepStatus::Failed),
            ],
        );
        assert_eq!(snapshot.run_status, RunStatus::Finished);
        assert_eq!(snapshot.fault.as_deref(), Some("adapter detection crashed"));
        assert_eq!(shared.lock().unwrap().runs, vec!["qc_raw_fastq".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn transport_for_mode_picks_the_adapter() -> TestResult {
    let backend = Arc::new(HttpBackend::new(
        "http://127.0.0.1:5000",
        Duration::from_secs(1),
    )?);

    let stream = AnyTransport::for_mode(
        TransportMode::Stream,
        Arc::clone(&backend),
        Duration::from_secs(2),
        Duration::from_secs(1),
    )?;
    assert_eq!(stream.mode(), TransportMode::Stream);

    let poll = AnyTransport::for_mode(
        TransportMode::Poll,
        backend,
        Duration::from_secs(2),
        Duration::from_secs(1),
    )?;
    assert_eq!(poll.mode(), TransportMode::Poll);
    Ok(())
}

#[tokio::test]
async fn poll_transport_stops_after_finished_marker() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (url, _shared) = spawn_backend(ServerState::default()).await?;
        let backend = Arc::new(HttpBackend::with_client(client(), url));

        let mut transport = PollTransport::new(backend, Duration::from_millis(10));
        let (tx, mut rx) = mpsc::channel(16);
        let handle = transport.start(3, tx);

        let mut events = Vec::new();
        while let Some(LoopEvent::Transport { generation, event }) = rx.recv().await {
            assert_eq!(generation, 3);
            let terminal = matches!(event, TransportEvent::Terminal { .. });
            events.push(event);
            if terminal {
                break;
            }
        }

        assert_eq!(events.len(), 2);
        match &events[0] {
            TransportEvent::Raw(RawEvent::StatusBlob(report)) => {
                assert!(report.status_content.contains("STATUS qc_raw_fastq finished"));
            }
            other => panic!("expected a status blob, got {other:?}"),
        }
        assert_eq!(events[1], TransportEvent::Terminal { fault: None });

        // The poller ended on its own.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());
        Ok(())
    })
    .await
}
