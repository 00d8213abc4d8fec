use chrono::{DateTime, Utc};

use crate::{
    AppState, Effect, Generation, Msg, PollPhase, Severity, StartForm, StartOutcome,
    StatusSnapshot, TransportFailure,
};

const MSG_INITIALIZING: &str = "Initializing...";
const MSG_SENDING_START: &str = "Sending request...";
const MSG_STARTED: &str = "Pipeline started, waiting for updates...";
const MSG_UNREACHABLE: &str = "Could not connect to the server";
const MSG_BREAKER_TRIPPED: &str = "Communication failed: too many consecutive errors, monitoring stopped";

/// Pure update function: applies a message to state and returns any effects.
///
/// Ledger changes made while handling `msg` are reported as a single trailing
/// [`Effect::RenderLog`].
pub fn update(mut state: AppState, msg: Msg, now: DateTime<Utc>) -> (AppState, Vec<Effect>) {
    let mut effects = match msg {
        Msg::Initialize => {
            state.show_snapshot(&StatusSnapshot::idle(MSG_INITIALIZING));
            vec![Effect::CheckDiagnostics, Effect::FetchInitialStatus]
        }
        Msg::StartRequested(form) => request_start(&mut state, form, now),
        Msg::StartCompleted(result) => complete_start(&mut state, result, now),
        Msg::StopRequested => request_stop(&mut state, now),
        Msg::StopCompleted(result) => complete_stop(&mut state, result, now),
        Msg::StopPolling => state.stop_polling(),
        Msg::Tick { generation } => tick(&mut state, generation),
        Msg::StatusFetched { generation, result } => {
            apply_status(&mut state, generation, result, now)
        }
        Msg::GraceElapsed { generation } => {
            if generation == state.generation() && state.phase() == PollPhase::Stopping {
                state.stop_polling()
            } else {
                Vec::new()
            }
        }
        Msg::InitialStatus(result) => apply_initial_status(&mut state, result, now),
        Msg::DiagnosticsReported(result) => {
            report_diagnostics(&mut state, result, now);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    let delta = state.take_outgoing();
    if !delta.is_empty() {
        effects.push(Effect::RenderLog(delta));
    }
    (state, effects)
}

fn request_start(state: &mut AppState, form: StartForm, now: DateTime<Utc>) -> Vec<Effect> {
    if state.start_pending() {
        state.log(Severity::Warning, "A start request is already pending.", now);
        return Vec::new();
    }
    let request = match form.validate() {
        Ok(request) => request,
        Err(err) => {
            state.log(Severity::Error, format!("Error: {err}."), now);
            return Vec::new();
        }
    };
    if state.ui().is_running() {
        state.log(Severity::Warning, "The pipeline is already running.", now);
        return Vec::new();
    }

    state.clear_ledger();
    state.log(Severity::Info, "Sending pipeline start request...", now);
    state.log(Severity::Info, request.summary(), now);
    state.set_start_pending(true);
    state.show_snapshot(&StatusSnapshot::idle(MSG_SENDING_START));
    vec![Effect::SubmitStart(request)]
}

fn complete_start(
    state: &mut AppState,
    result: Result<StartOutcome, TransportFailure>,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    state.set_start_pending(false);
    match result {
        Ok(StartOutcome::Accepted { message }) => {
            let effects = state.start_polling();
            state.log(Severity::Success, message, now);
            state.log(Severity::Info, "Starting pipeline status monitoring...", now);
            state.show_snapshot(&StatusSnapshot::running(MSG_STARTED));
            effects
        }
        Ok(StartOutcome::Rejected { message }) => {
            state.log(Severity::Error, format!("Start rejected: {message}"), now);
            state.show_snapshot(&StatusSnapshot::failed(message));
            Vec::new()
        }
        Err(failure) => {
            state.log(Severity::Error, format!("Connection error: {failure}"), now);
            state.show_snapshot(&StatusSnapshot::failed(MSG_UNREACHABLE));
            Vec::new()
        }
    }
}

fn request_stop(state: &mut AppState, now: DateTime<Utc>) -> Vec<Effect> {
    if !state.ui().is_running() {
        state.log(Severity::Info, "No running pipeline to stop.", now);
        return Vec::new();
    }
    if state.stop_pending() {
        state.log(Severity::Warning, "A stop request is already pending.", now);
        return Vec::new();
    }
    state.log(Severity::Warning, "Requesting pipeline interruption...", now);
    state.set_stop_pending(true);
    vec![Effect::SubmitStop]
}

fn complete_stop(
    state: &mut AppState,
    result: Result<String, TransportFailure>,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    state.set_stop_pending(false);
    match result {
        Ok(message) => {
            state.log(Severity::Warning, message, now);
            let grace = state.settings().stop_grace;
            state.begin_stopping(grace)
        }
        Err(failure) => {
            state.log(Severity::Error, format!("Stop request failed: {failure}"), now);
            Vec::new()
        }
    }
}

fn tick(state: &mut AppState, generation: Generation) -> Vec<Effect> {
    if generation != state.generation() || !state.phase().is_active() {
        return Vec::new();
    }
    // Skipped, not queued: the next tick after the response will fetch again.
    if state.fetch_in_flight() {
        return Vec::new();
    }
    state.set_fetch_in_flight(true);
    vec![Effect::FetchStatus { generation }]
}

fn apply_status(
    state: &mut AppState,
    generation: Generation,
    result: Result<StatusSnapshot, TransportFailure>,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    if generation != state.generation() || !state.phase().is_active() {
        return Vec::new();
    }
    state.set_fetch_in_flight(false);

    match result {
        Ok(snapshot) => {
            state.reset_errors();
            let was_terminal = state.ui().is_terminal();
            state.apply_snapshot(&snapshot, now);
            if state.ui().is_terminal() && !was_terminal {
                let grace = state.settings().terminal_grace;
                state.begin_stopping(grace)
            } else {
                Vec::new()
            }
        }
        Err(failure) => {
            let errors = state.record_errors();
            let text = match failure.status {
                Some(_) => format!("Server communication error: {failure}"),
                None => format!("Connection error: {failure}"),
            };
            state.log_forced(Severity::Error, text, now);
            if errors >= state.settings().max_consecutive_errors {
                state.log_forced(Severity::Error, MSG_BREAKER_TRIPPED, now);
                state.show_snapshot(&StatusSnapshot::failed(MSG_BREAKER_TRIPPED));
                state.stop_polling()
            } else {
                Vec::new()
            }
        }
    }
}

fn apply_initial_status(
    state: &mut AppState,
    result: Result<StatusSnapshot, TransportFailure>,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    state.mark_initial_status_seen();
    let Ok(snapshot) = result else {
        return Vec::new();
    };
    state.show_snapshot(&snapshot);
    if !snapshot.running {
        return Vec::new();
    }
    let effects = state.start_polling();
    state.log(
        Severity::Info,
        "Pipeline already running, starting monitoring...",
        now,
    );
    effects
}

fn report_diagnostics(
    state: &mut AppState,
    result: Result<bool, TransportFailure>,
    now: DateTime<Utc>,
) {
    state.mark_diagnostics_seen();
    match result {
        Ok(available) => {
            state.log(Severity::Success, "Connection to the server established", now);
            if available {
                state.log(Severity::Success, "Pipeline executor available", now);
            } else {
                state.log(Severity::Error, "Pipeline executor not available", now);
            }
        }
        Err(TransportFailure {
            status: Some(status),
            ..
        }) => {
            state.log(
                Severity::Warning,
                format!("Server responded with an error: {status}"),
                now,
            );
        }
        Err(failure) => {
            state.log(
                Severity::Error,
                format!("Unable to connect to the server: {failure}"),
                now,
            );
        }
    }
}
