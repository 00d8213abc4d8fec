use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn};
use pipewatch_core::{AppViewModel, Effect, Msg, StartOutcome, TransportFailure};
use pipewatch_engine::{
    ApiError, EngineError, EngineEvent, EngineEvents, EngineHandle, FailureKind, PipelineApi,
    StartReply,
};

use super::app::AppEvent;
use super::ui::render::Renderer;

/// Executes core effects against the engine and the terminal.
pub struct EffectRunner {
    engine: EngineHandle,
    renderer: Renderer,
}

impl EffectRunner {
    pub fn new(
        api: Arc<dyn PipelineApi>,
        renderer: Renderer,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Result<Self, EngineError> {
        let (engine, events) = EngineHandle::spawn(api)?;
        spawn_event_loop(events, event_tx);
        Ok(Self { engine, renderer })
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchStatus { generation } => self.engine.fetch_status(generation),
                Effect::FetchInitialStatus => self.engine.fetch_initial_status(),
                Effect::CheckDiagnostics => self.engine.check_diagnostics(),
                Effect::SubmitStart(request) => {
                    engine_info!("SubmitStart {}", request.summary());
                    self.engine.submit_start(request);
                }
                Effect::SubmitStop => {
                    engine_info!("SubmitStop");
                    self.engine.submit_stop();
                }
                Effect::StartTicker {
                    generation,
                    interval,
                } => self.engine.start_ticker(generation, interval),
                Effect::CancelTicker => self.engine.cancel_ticker(),
                Effect::ScheduleStop { generation, after } => {
                    engine_info!(
                        "Stopping poll loop {} in {} s",
                        generation,
                        after.as_secs()
                    );
                    self.engine.schedule_stop(generation, after);
                }
                Effect::RenderLog(delta) => self.renderer.render_log(&delta),
            }
        }
    }

    pub fn render_view(&mut self, view: &AppViewModel) {
        self.renderer.render_view(view);
    }
}

fn spawn_event_loop(events: EngineEvents, event_tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        while let Some(event) = events.recv() {
            if event_tx.send(AppEvent::Core(map_event(event))).is_err() {
                break;
            }
        }
        engine_debug!("Engine event stream closed");
    });
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Tick { generation } => Msg::Tick { generation },
        EngineEvent::StatusFetched { generation, result } => Msg::StatusFetched {
            generation,
            result: result.map_err(map_failure),
        },
        EngineEvent::InitialStatus(result) => {
            if let Err(err) = &result {
                engine_debug!("Initial status probe failed: {}", err);
            }
            Msg::InitialStatus(result.map_err(map_failure))
        }
        EngineEvent::StartCompleted(result) => {
            Msg::StartCompleted(result.map(map_start_reply).map_err(map_failure))
        }
        EngineEvent::StopCompleted(result) => Msg::StopCompleted(result.map_err(map_failure)),
        EngineEvent::Diagnostics(result) => Msg::DiagnosticsReported(
            result
                .map(|report| report.executor_available)
                .map_err(map_failure),
        ),
        EngineEvent::GraceElapsed { generation } => Msg::GraceElapsed { generation },
    }
}

fn map_start_reply(reply: StartReply) -> StartOutcome {
    if reply.accepted {
        StartOutcome::Accepted {
            message: reply.message,
        }
    } else {
        engine_warn!("Start refused: {}", reply.message);
        StartOutcome::Rejected {
            message: reply.message,
        }
    }
}

fn map_failure(err: ApiError) -> TransportFailure {
    match err.kind {
        FailureKind::HttpStatus(code) => TransportFailure::http(code, err.message),
        FailureKind::InvalidUrl
        | FailureKind::Timeout
        | FailureKind::Network
        | FailureKind::Decode => TransportFailure::network(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pipewatch_core::{Msg, StartOutcome, TransportFailure};
    use pipewatch_engine::{ApiError, DiagnosticsReport, EngineEvent, FailureKind, StartReply};
    use pretty_assertions::assert_eq;

    use super::map_event;

    #[test]
    fn http_failures_keep_their_status() {
        let msg = map_event(EngineEvent::StatusFetched {
            generation: 2,
            result: Err(ApiError::new(
                FailureKind::HttpStatus(503),
                "Service Unavailable",
            )),
        });
        assert_eq!(
            msg,
            Msg::StatusFetched {
                generation: 2,
                result: Err(TransportFailure::http(503, "Service Unavailable")),
            }
        );
    }

    #[test]
    fn transport_failures_have_no_status() {
        let msg = map_event(EngineEvent::StopCompleted(Err(ApiError::new(
            FailureKind::Timeout,
            "operation timed out",
        ))));
        assert_eq!(
            msg,
            Msg::StopCompleted(Err(TransportFailure::network(
                "timeout: operation timed out"
            )))
        );
    }

    #[test]
    fn refused_start_becomes_a_rejection() {
        let msg = map_event(EngineEvent::StartCompleted(Ok(StartReply {
            accepted: false,
            message: "busy".to_string(),
        })));
        assert_eq!(
            msg,
            Msg::StartCompleted(Ok(StartOutcome::Rejected {
                message: "busy".to_string()
            }))
        );
    }

    #[test]
    fn diagnostics_report_availability() {
        let msg = map_event(EngineEvent::Diagnostics(Ok(DiagnosticsReport {
            executor_available: false,
        })));
        assert_eq!(msg, Msg::DiagnosticsReported(Ok(false)));
    }
}
