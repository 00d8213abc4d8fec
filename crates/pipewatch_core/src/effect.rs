use std::time::Duration;

use crate::{Generation, LedgerDelta, StartRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// `GET /status` for the poll loop; answer with `Msg::StatusFetched`.
    FetchStatus { generation: Generation },
    /// `GET /status` once at startup; answer with `Msg::InitialStatus`.
    FetchInitialStatus,
    /// `GET /debug/pipeline`; answer with `Msg::DiagnosticsReported`.
    CheckDiagnostics,
    SubmitStart(StartRequest),
    SubmitStop,
    /// Replace any running ticker with one firing `Msg::Tick` every `interval`.
    StartTicker {
        generation: Generation,
        interval: Duration,
    },
    /// Cancel the ticker and any pending delayed stop.
    CancelTicker,
    /// Fire `Msg::GraceElapsed` once after `after`.
    ScheduleStop {
        generation: Generation,
        after: Duration,
    },
    /// Net ledger change for the renderer.
    RenderLog(LedgerDelta),
}
