// tests/render_and_cli.rs
mod common;

use clap::Parser;

use crate::common::builders::store_with;

use pipewatch::backend::StreamMessage;
use pipewatch::cli::CliArgs;
use pipewatch::parse_assignment;
use pipewatch::render::{render_snapshot, run_controls_enabled, status_glyph};
use pipewatch::steps::{StepStatus, Transition};
use pipewatch::types::TransportMode;

#[test]
fn render_lists_steps_in_order_with_status() {
    let mut store = store_with(&["qc_raw_fastq", "trim_fastq", "index_bam"]);
    store.apply_batch([
        Transition::RunStarted,
        Transition::set("qc_raw_fastq", StepStatus::Finished),
        Transition::set("trim_fastq", StepStatus::Running),
    ]);

    let rendered = render_snapshot(&store.snapshot());
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "pipeline: running");
    assert_eq!(lines[1], "  [x] qc_raw_fastq  finished");
    assert_eq!(lines[2], "  [>] trim_fastq    running");
    assert_eq!(lines[3], "  [ ] index_bam     pending");
    assert_eq!(lines.len(), 4);
}

#[test]
fn render_shows_fault() {
    let mut store = store_with(&["dedup_bam"]);
    store.apply_batch([
        Transition::set("dedup_bam", StepStatus::Running),
        Transition::MarkAllRunningAsFailed,
        Transition::RunFinished {
            fault: Some("out of memory".to_string()),
        },
    ]);

    let rendered = render_snapshot(&store.snapshot());

    assert!(rendered.starts_with("pipeline: finished"));
    assert!(rendered.contains(&format!("{} dedup_bam", status_glyph(StepStatus::Failed))));
    assert!(rendered.trim_end().ends_with("fault: out of memory"));
}

#[test]
fn run_controls_disabled_only_while_running() {
    let mut store = store_with(&["a"]);
    assert!(run_controls_enabled(&store.snapshot()));

    store.apply(Transition::set("a", StepStatus::Running));
    assert!(!run_controls_enabled(&store.snapshot()));

    store.apply(Transition::RunFinished { fault: None });
    assert!(run_controls_enabled(&store.snapshot()));
}

#[test]
fn cli_parses_run_options() {
    let args = CliArgs::try_parse_from([
        "pipewatch",
        "--backend-url",
        "http://10.0.0.2:5000",
        "--transport",
        "poll",
        "--start-step",
        "trim_fastq",
        "--once",
        "--set-backend-config",
        "threads=8",
        "--set-backend-config",
        "genome=hg38",
    ])
    .unwrap();

    assert_eq!(args.backend_url.as_deref(), Some("http://10.0.0.2:5000"));
    assert_eq!(args.transport, Some(TransportMode::Poll));
    assert_eq!(args.start_step.as_deref(), Some("trim_fastq"));
    assert!(args.once);
    assert!(!args.clear_history);
    assert_eq!(args.set_backend_config.len(), 2);
}

#[test]
fn cli_rejects_unknown_transport() {
    assert!(CliArgs::try_parse_from(["pipewatch", "--transport", "smoke-signals"]).is_err());
}

#[test]
fn assignments_parse_json_or_fall_back_to_string() {
    assert_eq!(
        parse_assignment("threads=8").unwrap(),
        ("threads".to_string(), serde_json::json!(8))
    );
    assert_eq!(
        parse_assignment("genome=hg38").unwrap(),
        ("genome".to_string(), serde_json::json!("hg38"))
    );
    assert_eq!(
        parse_assignment("paired=true").unwrap(),
        ("paired".to_string(), serde_json::json!(true))
    );
    assert!(parse_assignment("no-equals-sign").is_err());
    assert!(parse_assignment("=value").is_err());
}

#[test]
fn stream_payloads_without_json_are_kept_as_text() {
    let parsed = StreamMessage::from_event_data(r#"{"message":"hello","level":"INFO"}"#);
    assert_eq!(parsed.message, "hello");
    assert_eq!(parsed.level.as_deref(), Some("INFO"));

    let bare = StreamMessage::from_event_data("plain line");
    assert_eq!(bare.message, "plain line");
    assert_eq!(bare.level, None);
}

#[test]
fn log_level_names() {
    use pipewatch::logging::parse_level_str;

    assert_eq!(parse_level_str("DEBUG"), Some(tracing::Level::DEBUG));
    assert_eq!(parse_level_str(" warning "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("loud"), None);
}
