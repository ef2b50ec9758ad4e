// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod parse;
pub mod render;
pub mod steps;
pub mod transport;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::{Backend, BackendConfig, HttpBackend};
use crate::cli::CliArgs;
use crate::config::{default_config_path, load_or_default, ConfigFile, RawConfigFile};
use crate::engine::{CoreLoop, LoopEvent, LoopOptions, Runtime};
use crate::render::render_snapshot;
use crate::steps::StepStateStore;
use crate::transport::AnyTransport;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - the backend client and the chosen transport
/// - the step state store with a terminal renderer subscribed to it
/// - the reconciliation loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let explicit = args.config.is_some();
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let mut raw = load_or_default(&config_path, explicit)?;
    apply_cli_overrides(&mut raw, &args);
    let cfg = ConfigFile::try_from(raw)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let backend = Arc::new(HttpBackend::new(
        &cfg.dashboard.backend_url,
        cfg.dashboard.request_timeout,
    )?);

    if args.show_backend_config || !args.set_backend_config.is_empty() {
        return backend_config_command(backend.as_ref(), &args.set_backend_config).await;
    }

    let transport = AnyTransport::for_mode(
        cfg.dashboard.transport,
        Arc::clone(&backend),
        cfg.dashboard.poll_interval,
        cfg.dashboard.request_timeout,
    )?;

    // Loop event channel.
    let (tx, rx) = mpsc::channel::<LoopEvent>(256);

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(LoopEvent::ShutdownRequested).await;
        });
    }

    // Seed user actions before the loop starts so they are handled first.
    if args.clear_history {
        tx.send(LoopEvent::ClearRequested).await?;
    }
    if let Some(start_step) = args.start_step.clone() {
        tx.send(LoopEvent::RunRequested { start_step }).await?;
    }

    let mut store = StepStateStore::new(cfg.registry.clone());
    let mut last_rendered = String::new();
    store.subscribe(move |snapshot| {
        let rendered = render_snapshot(snapshot);
        if rendered != last_rendered {
            println!("{rendered}");
            last_rendered = rendered;
        }
    });

    let options = LoopOptions {
        transport: cfg.dashboard.transport,
        exit_when_idle: args.once,
        ..LoopOptions::default()
    };

    let core = CoreLoop::new(store, options);
    let runtime = Runtime::new(core, tx, rx, transport, backend);
    let core = runtime.run().await?;

    info!(run_status = %core.snapshot().run_status, "pipewatch finished");
    Ok(())
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(url) = &args.backend_url {
        raw.dashboard.backend_url = url.clone();
    }
    if let Some(mode) = args.transport {
        raw.dashboard.transport = mode;
    }
}

/// `--show-backend-config` / `--set-backend-config KEY=VALUE`.
async fn backend_config_command<B: Backend>(backend: &B, assignments: &[String]) -> Result<()> {
    let mut config = backend.fetch_config().await?;

    if !assignments.is_empty() {
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment)?;
            debug!(%key, %value, "setting backend config value");
            config.insert(key, value);
        }
        let message = backend.save_config(&config).await?;
        info!(%message, "backend configuration saved");
    }

    print_backend_config(&config)?;
    Ok(())
}

/// Split `KEY=VALUE`. The value is taken as JSON when it parses as JSON and
/// as a plain string otherwise.
pub fn parse_assignment(assignment: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{assignment}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty key in '{assignment}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn print_backend_config(config: &BackendConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Simple dry-run output: print connection settings and the step list.
fn print_dry_run(cfg: &ConfigFile) {
    println!("pipewatch dry-run");
    println!("  dashboard.backend_url = {}", cfg.dashboard.backend_url);
    println!("  dashboard.transport = {}", cfg.dashboard.transport);
    println!("  dashboard.poll_interval = {:?}", cfg.dashboard.poll_interval);
    println!("  dashboard.request_timeout = {:?}", cfg.dashboard.request_timeout);
    println!();

    println!("steps ({}):", cfg.registry.len());
    for (i, step) in cfg.registry.list().iter().enumerate() {
        println!("  {:>2}. {step}", i + 1);
    }

    debug!("dry-run complete (no backend contact)");
}
