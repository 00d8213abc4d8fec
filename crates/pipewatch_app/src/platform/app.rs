use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, set_poll_tick};
use pipewatch_core::{update, AppState, Msg, PollSettings, StartForm, UiState};

use super::effects::EffectRunner;

/// Everything the main loop reacts to.
pub enum AppEvent {
    Core(Msg),
    /// The user detached; stop polling and exit without touching the job.
    Quit,
}

/// What the invocation is meant to accomplish once startup probes are done.
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    Watch,
    Start(StartForm),
    Stop,
}

/// Owns the single `AppState` and feeds it messages in arrival order.
pub struct Session {
    state: AppState,
    runner: EffectRunner,
    goal: Option<Goal>,
    ticks: u64,
}

impl Session {
    pub fn new(settings: PollSettings, runner: EffectRunner, goal: Goal) -> Self {
        Self {
            state: AppState::new(settings),
            runner,
            goal: Some(goal),
            ticks: 0,
        }
    }

    /// Runs until the goal is reached and the poll loop has settled.
    pub fn run(mut self, events: mpsc::Receiver<AppEvent>) -> UiState {
        self.dispatch(Msg::Initialize);

        while let Ok(event) = events.recv() {
            match event {
                AppEvent::Core(msg) => self.dispatch(msg),
                AppEvent::Quit => {
                    engine_info!("Detaching on user request");
                    self.dispatch(Msg::StopPolling);
                    break;
                }
            }

            if self.state.startup_complete() {
                if let Some(goal) = self.goal.take() {
                    self.pursue(goal);
                }
            }
            if self.goal.is_none() && self.state.is_settled() {
                break;
            }
        }

        self.state.ui().clone()
    }

    fn pursue(&mut self, goal: Goal) {
        engine_debug!("Startup complete; pursuing {:?}", goal);
        match goal {
            Goal::Watch => {}
            Goal::Start(form) => self.dispatch(Msg::StartRequested(form)),
            Goal::Stop => self.dispatch(Msg::StopRequested),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        if matches!(msg, Msg::Tick { .. }) {
            self.ticks += 1;
            set_poll_tick(self.ticks);
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg, Utc::now());
        self.runner.run(effects);
        if state.consume_dirty() {
            self.runner.render_view(&state.view());
        }
        self.state = state;
    }
}

/// Reads `stop` / `quit` commands from stdin while a session runs.
pub fn spawn_stdin_reader(event_tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let event = match line.trim() {
                "stop" => AppEvent::Core(Msg::StopRequested),
                "quit" | "q" => AppEvent::Quit,
                "" => continue,
                other => {
                    eprintln!("Unknown command {other:?}; type `stop` or `quit`.");
                    continue;
                }
            };
            if event_tx.send(event).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    use pipewatch_core::{PollSettings, StartRequest, StatusSnapshot, UiState};
    use pipewatch_engine::{ApiError, DiagnosticsReport, FailureKind, PipelineApi, StartReply};

    use super::{Goal, Session};
    use crate::cli::start_form;
    use crate::platform::effects::EffectRunner;
    use crate::platform::ui::render::Renderer;
    use crate::platform::ui::theme::Theme;

    #[derive(Default)]
    struct ScriptedApi {
        started: AtomicBool,
    }

    #[async_trait::async_trait]
    impl PipelineApi for ScriptedApi {
        async fn status(&self) -> Result<StatusSnapshot, ApiError> {
            if self.started.load(Ordering::SeqCst) {
                Ok(StatusSnapshot::idle("Pipeline completata con successo!")
                    .with_steps(4, 4)
                    .with_log(["[INFO] step 1", "[SUCCESS] done"]))
            } else {
                Ok(StatusSnapshot::idle("Waiting"))
            }
        }

        async fn start(&self, _request: &StartRequest) -> Result<StartReply, ApiError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(StartReply {
                accepted: true,
                message: "Pipeline avviata".to_string(),
            })
        }

        async fn stop(&self) -> Result<String, ApiError> {
            Err(ApiError::new(FailureKind::HttpStatus(400), "not running"))
        }

        async fn diagnostics(&self) -> Result<DiagnosticsReport, ApiError> {
            Ok(DiagnosticsReport {
                executor_available: true,
            })
        }
    }

    fn fast_settings() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(20),
            terminal_grace: Duration::from_millis(60),
            stop_grace: Duration::from_millis(60),
            ..PollSettings::default()
        }
    }

    fn session(goal: Goal) -> (Session, mpsc::Receiver<super::AppEvent>) {
        let (event_tx, event_rx) = mpsc::channel();
        let runner = EffectRunner::new(
            Arc::new(ScriptedApi::default()),
            Renderer::new(Theme::Dark),
            event_tx,
        )
        .unwrap();
        (Session::new(fast_settings(), runner, goal), event_rx)
    }

    #[test]
    fn watch_with_nothing_running_exits_after_startup() {
        let (session, events) = session(Goal::Watch);
        let outcome = session.run(events);
        assert_eq!(
            outcome,
            UiState::Idle {
                message: "Waiting".to_string()
            }
        );
    }

    #[test]
    fn start_follows_the_job_to_completion() {
        let form = start_form("Lombardia".to_string(), "ristoranti".to_string(), None);
        let (session, events) = session(Goal::Start(form));
        let outcome = session.run(events);
        assert!(matches!(outcome, UiState::Succeeded { total: 4, .. }));
    }

    #[test]
    fn stop_with_nothing_running_is_a_no_op() {
        let (session, events) = session(Goal::Stop);
        let outcome = session.run(events);
        assert!(!outcome.is_running());
    }
}
