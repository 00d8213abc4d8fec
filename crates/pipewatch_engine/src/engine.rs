use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use pipewatch_core::{Generation, StartRequest};
use thiserror::Error;
use tokio::sync::mpsc as async_mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, PipelineApi};

/// Shortest ticker period accepted; `tokio::time::interval` rejects zero.
const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build engine runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("failed to spawn engine thread: {0}")]
    Thread(#[source] io::Error),
}

/// One-shot request against the orchestrator.
enum ApiCall {
    FetchStatus { generation: Generation },
    FetchInitialStatus,
    CheckDiagnostics,
    SubmitStart(StartRequest),
    SubmitStop,
}

enum EngineCommand {
    Call(ApiCall),
    StartTicker {
        generation: Generation,
        interval: Duration,
    },
    CancelTicker,
    ScheduleStop {
        generation: Generation,
        after: Duration,
    },
}

/// Sending side of the engine. Dropping it shuts the engine thread down.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
}

/// Receiving side of the engine, usually moved to a forwarding thread.
pub struct EngineEvents {
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn spawn(api: Arc<dyn PipelineApi>) -> Result<(Self, EngineEvents), EngineError> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;

        thread::Builder::new()
            .name("pipewatch-engine".to_string())
            .spawn(move || {
                runtime.block_on(run(api, cmd_rx, event_tx));
                engine_debug!("Engine thread finished");
            })
            .map_err(EngineError::Thread)?;

        Ok((Self { cmd_tx }, EngineEvents { event_rx }))
    }

    pub fn fetch_status(&self, generation: Generation) {
        self.send(EngineCommand::Call(ApiCall::FetchStatus { generation }));
    }

    pub fn fetch_initial_status(&self) {
        self.send(EngineCommand::Call(ApiCall::FetchInitialStatus));
    }

    pub fn check_diagnostics(&self) {
        self.send(EngineCommand::Call(ApiCall::CheckDiagnostics));
    }

    pub fn submit_start(&self, request: StartRequest) {
        self.send(EngineCommand::Call(ApiCall::SubmitStart(request)));
    }

    pub fn submit_stop(&self) {
        self.send(EngineCommand::Call(ApiCall::SubmitStop));
    }

    /// Replaces any running ticker.
    pub fn start_ticker(&self, generation: Generation, interval: Duration) {
        self.send(EngineCommand::StartTicker {
            generation,
            interval,
        });
    }

    /// Cancels the ticker and any scheduled stop.
    pub fn cancel_ticker(&self) {
        self.send(EngineCommand::CancelTicker);
    }

    pub fn schedule_stop(&self, generation: Generation, after: Duration) {
        self.send(EngineCommand::ScheduleStop { generation, after });
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("Engine thread is gone; command dropped");
        }
    }
}

impl EngineEvents {
    /// Blocks until the next event; `None` once the engine has shut down.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn run(
    api: Arc<dyn PipelineApi>,
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    // Shared by the ticker and the grace timer of the current poll loop.
    let mut timers: Option<CancellationToken> = None;

    while let Some(command) = cmd_rx.recv().await {
        match command {
            EngineCommand::StartTicker {
                generation,
                interval,
            } => {
                cancel_timers(&mut timers);
                let token = CancellationToken::new();
                engine_info!(
                    "Polling every {} ms (generation {})",
                    interval.as_millis(),
                    generation
                );
                tokio::spawn(ticker(generation, interval, token.clone(), event_tx.clone()));
                timers = Some(token);
            }
            EngineCommand::CancelTicker => cancel_timers(&mut timers),
            EngineCommand::ScheduleStop { generation, after } => {
                let token = timers.get_or_insert_with(CancellationToken::new).clone();
                tokio::spawn(grace(generation, after, token, event_tx.clone()));
            }
            EngineCommand::Call(call) => {
                let api = api.clone();
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let event = call_api(api.as_ref(), call).await;
                    let _ = event_tx.send(event);
                });
            }
        }
    }

    cancel_timers(&mut timers);
}

fn cancel_timers(timers: &mut Option<CancellationToken>) {
    if let Some(token) = timers.take() {
        token.cancel();
    }
}

async fn call_api(api: &dyn PipelineApi, call: ApiCall) -> EngineEvent {
    match call {
        ApiCall::FetchStatus { generation } => EngineEvent::StatusFetched {
            generation,
            result: api.status().await,
        },
        ApiCall::FetchInitialStatus => EngineEvent::InitialStatus(api.status().await),
        ApiCall::CheckDiagnostics => EngineEvent::Diagnostics(api.diagnostics().await),
        ApiCall::SubmitStart(request) => EngineEvent::StartCompleted(api.start(&request).await),
        ApiCall::SubmitStop => EngineEvent::StopCompleted(api.stop().await),
    }
}

async fn ticker(
    generation: Generation,
    period: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let period = period.max(MIN_TICK);
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if event_tx.send(EngineEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        }
    }
    engine_debug!("Ticker for generation {} stopped", generation);
}

async fn grace(
    generation: Generation,
    after: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = time::sleep(after) => {
            let _ = event_tx.send(EngineEvent::GraceElapsed { generation });
        }
    }
}
