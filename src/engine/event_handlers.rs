// src/engine/event_handlers.rs

//! Event handling logic for the core loop.

use tracing::{debug, info, warn};

use crate::engine::{
    DisplayLog, Epoch, Generation, LoopOptions, LoopPhase, RawEvent, TransportEvent,
};
use crate::parse::{parse_log_line, parse_status_blob, Terminal};
use crate::steps::{ModuleName, StepStateStore, Transition};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// `POST /run`; the reply comes back tagged with `epoch`.
    SubmitRun { epoch: Epoch, start_step: ModuleName },
    /// Start the configured transport as `generation`.
    StartTransport { generation: Generation },
    /// Stop the adapter started as `generation`.
    StopTransport { generation: Generation },
    /// `GET /history`; the reply comes back tagged with `epoch`.
    RefreshHistory { epoch: Epoch },
    /// `POST /history`.
    ClearBackendHistory,
    /// Request that the process exits (used for `--once` when settled).
    RequestExit,
}

/// Decision returned by the core after handling a single `LoopEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn none() -> Self {
        Self::with(Vec::new())
    }
}

/// Lifecycle bookkeeping owned by the core loop.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub phase: LoopPhase,
    pub epoch: Epoch,
    pub active_generation: Option<Generation>,
    /// Run request sent to the backend and not answered yet.
    pub pending_submit: Option<(Epoch, ModuleName)>,
    /// History refresh issued and not answered yet.
    pub pending_refresh: Option<Epoch>,
    /// `POST /history` in flight.
    pub pending_clear: bool,
    next_generation: Generation,
}

impl LoopState {
    fn next_generation(&mut self) -> Generation {
        self.next_generation += 1;
        self.next_generation
    }

    /// Idle with no request or adapter outstanding.
    pub fn is_settled(&self) -> bool {
        self.phase == LoopPhase::Idle
            && self.active_generation.is_none()
            && self.pending_submit.is_none()
            && self.pending_refresh.is_none()
            && !self.pending_clear
    }

    fn stop_active(&mut self, commands: &mut Vec<CoreCommand>) {
        if let Some(generation) = self.active_generation.take() {
            commands.push(CoreCommand::StopTransport { generation });
        }
    }
}

/// Initial render: load history while idle.
pub fn handle_bootstrap(state: &mut LoopState) -> CoreStep {
    state.pending_refresh = Some(state.epoch);
    CoreStep::with(vec![CoreCommand::RefreshHistory { epoch: state.epoch }])
}

/// A user asked for a run. Only one run (or run request) at a time.
pub fn handle_run_requested(state: &mut LoopState, start_step: ModuleName) -> CoreStep {
    if state.phase != LoopPhase::Idle {
        warn!(start_step = %start_step, phase = ?state.phase, "run already in progress; ignoring run request");
        return CoreStep::none();
    }
    if let Some((_, pending)) = &state.pending_submit {
        warn!(start_step = %start_step, pending = %pending, "run request already in flight; ignoring");
        return CoreStep::none();
    }

    info!(start_step = %start_step, "submitting run request");
    state.pending_submit = Some((state.epoch, start_step.clone()));
    CoreStep::with(vec![CoreCommand::SubmitRun {
        epoch: state.epoch,
        start_step,
    }])
}

/// The backend accepted a run: reset the store and start the transport.
pub fn handle_run_accepted(
    state: &mut LoopState,
    store: &mut StepStateStore,
    log: &mut DisplayLog,
    options: &LoopOptions,
    epoch: Epoch,
    start_step: ModuleName,
    message: String,
) -> CoreStep {
    if !matches_pending_submit(state, epoch) {
        warn!(start_step = %start_step, epoch, "ignoring acceptance of a superseded run request");
        return CoreStep::none();
    }
    state.pending_submit = None;

    info!(start_step = %start_step, %message, "run accepted by backend");

    let mut commands = Vec::new();
    state.stop_active(&mut commands);

    state.epoch += 1;
    state.pending_refresh = None;
    store.apply_batch([Transition::ResetAll, Transition::RunStarted]);

    log.clear();
    log.push(format!("Attempting to run pipeline from step: {start_step}"));

    let generation = state.next_generation();
    state.active_generation = Some(generation);
    state.phase = if options.transport.has_connect_signal() {
        LoopPhase::Starting
    } else {
        LoopPhase::Active
    };
    debug!(generation, epoch = state.epoch, phase = ?state.phase, "run starting");

    commands.push(CoreCommand::StartTransport { generation });
    CoreStep::with(commands)
}

pub fn handle_run_rejected(
    state: &mut LoopState,
    log: &mut DisplayLog,
    epoch: Epoch,
    start_step: ModuleName,
    message: String,
) -> CoreStep {
    if !matches_pending_submit(state, epoch) {
        debug!(start_step = %start_step, epoch, "ignoring rejection of a superseded run request");
        return CoreStep::none();
    }
    state.pending_submit = None;
    warn!(start_step = %start_step, %message, "run rejected");
    log.push(format!("Run from {start_step} rejected: {message}"));
    CoreStep::none()
}

/// Anything from a transport adapter.
pub fn handle_transport_event(
    state: &mut LoopState,
    store: &mut StepStateStore,
    log: &mut DisplayLog,
    generation: Generation,
    event: TransportEvent,
) -> CoreStep {
    if state.active_generation != Some(generation) {
        debug!(
            generation,
            active = ?state.active_generation,
            "discarding event from stopped transport"
        );
        return CoreStep::none();
    }

    match event {
        TransportEvent::Connected => {
            if state.phase == LoopPhase::Starting {
                debug!(generation, "transport connected");
                state.phase = LoopPhase::Active;
            }
            CoreStep::none()
        }
        TransportEvent::Raw(raw) => {
            if state.phase == LoopPhase::Starting {
                state.phase = LoopPhase::Active;
            }
            handle_raw_event(state, store, log, raw)
        }
        TransportEvent::Terminal { fault: None } => {
            CoreStep::with(finish_run(state, store, Vec::new(), Terminal::Completed))
        }
        TransportEvent::Terminal { fault: Some(fault) } => {
            // Keep whatever the store shows; partial results stay visible.
            warn!(generation, %fault, "transport failed; leaving last known state");
            log.push(format!("Connection lost: {fault}"));
            let mut commands = Vec::new();
            state.stop_active(&mut commands);
            state.phase = LoopPhase::Idle;
            store.apply(Transition::RunFinished { fault: Some(fault) });
            CoreStep::with(commands)
        }
    }
}

fn handle_raw_event(
    state: &mut LoopState,
    store: &mut StepStateStore,
    log: &mut DisplayLog,
    raw: RawEvent,
) -> CoreStep {
    let (parsed, is_blob) = match raw {
        RawEvent::LogLine { message, level } => {
            let parsed = parse_log_line(&message, level.as_deref());
            info!(target: "pipewatch::backend", backend_level = level.as_deref().unwrap_or("-"), "{message}");
            log.push(message);
            (parsed, false)
        }
        RawEvent::StatusBlob(report) => {
            log.replace(&report.log_content);
            let parsed = parse_status_blob(&report.status_content);
            debug!(
                transitions = parsed.transitions.len(),
                log_lines = log.len(),
                "status blob parsed"
            );
            (parsed, true)
        }
    };

    // One notification per raw event, terminal or not.
    match parsed.terminal {
        Some(terminal) => CoreStep::with(finish_run(state, store, parsed.transitions, terminal)),
        None => {
            if is_blob || !parsed.transitions.is_empty() {
                store.apply_batch(parsed.transitions);
            }
            CoreStep::none()
        }
    }
}

/// Terminal signal while a run is active: apply what came with it together
/// with the end of the run, stop the adapter and ask for the authoritative
/// refresh.
fn finish_run(
    state: &mut LoopState,
    store: &mut StepStateStore,
    transitions: Vec<Transition>,
    terminal: Terminal,
) -> Vec<CoreCommand> {
    let fault = match terminal {
        Terminal::Completed => None,
        Terminal::Fatal(message) => Some(message),
    };

    info!(fault = ?fault, "run over; refreshing from backend history");
    store.apply_batch(
        transitions
            .into_iter()
            .chain(std::iter::once(Transition::RunFinished { fault })),
    );

    let mut commands = Vec::new();
    state.stop_active(&mut commands);
    state.phase = LoopPhase::Finishing;
    state.pending_refresh = Some(state.epoch);
    commands.push(CoreCommand::RefreshHistory { epoch: state.epoch });
    commands
}

pub fn handle_history_loaded(
    state: &mut LoopState,
    store: &mut StepStateStore,
    epoch: Epoch,
    completed: Vec<ModuleName>,
) -> CoreStep {
    if state.pending_refresh != Some(epoch) {
        debug!(epoch, current = state.epoch, "ignoring stale history reply");
        return CoreStep::none();
    }
    state.pending_refresh = None;

    debug!(completed = completed.len(), "applying backend history");
    store.apply(Transition::SyncCompleted { modules: completed });

    if state.phase == LoopPhase::Finishing {
        info!("run settled");
        state.phase = LoopPhase::Idle;
    }
    CoreStep::none()
}

pub fn handle_history_failed(state: &mut LoopState, epoch: Epoch, error: String) -> CoreStep {
    if state.pending_refresh != Some(epoch) {
        return CoreStep::none();
    }
    state.pending_refresh = None;
    warn!(%error, "history refresh failed; keeping derived state");

    if state.phase == LoopPhase::Finishing {
        state.phase = LoopPhase::Idle;
    }
    CoreStep::none()
}

/// "Clear history": reset right away, whatever the loop was doing.
pub fn handle_clear_requested(
    state: &mut LoopState,
    store: &mut StepStateStore,
    log: &mut DisplayLog,
) -> CoreStep {
    info!(phase = ?state.phase, "clearing run history");

    let mut commands = Vec::new();
    state.stop_active(&mut commands);

    state.epoch += 1;
    state.phase = LoopPhase::Idle;
    state.pending_submit = None;
    state.pending_refresh = None;
    state.pending_clear = true;

    store.reset();
    log.clear();

    commands.push(CoreCommand::ClearBackendHistory);
    CoreStep::with(commands)
}

pub fn handle_history_cleared(state: &mut LoopState, outcome: Result<String, String>) -> CoreStep {
    state.pending_clear = false;
    match outcome {
        Ok(message) => info!(%message, "backend history cleared"),
        Err(error) => warn!(%error, "backend refused to clear history"),
    }
    CoreStep::none()
}

pub fn handle_shutdown(state: &mut LoopState) -> CoreStep {
    let mut commands = Vec::new();
    state.stop_active(&mut commands);
    state.phase = LoopPhase::Idle;
    CoreStep {
        commands,
        keep_running: false,
    }
}

fn matches_pending_submit(state: &LoopState, epoch: Epoch) -> bool {
    epoch == state.epoch && matches!(&state.pending_submit, Some((e, _)) if *e == epoch)
}
