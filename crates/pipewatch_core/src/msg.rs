use std::fmt;

use crate::{StartForm, StatusSnapshot};

/// Poll-loop incarnation. Bumped on every start/stop so late events from an
/// earlier loop can be recognised and dropped.
pub type Generation = u64;

/// Transport-level failure as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// HTTP status when the server answered with a non-2xx code.
    pub status: Option<u16>,
    pub detail: String,
}

impl TransportFailure {
    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) if self.detail.is_empty() => write!(f, "HTTP {status}"),
            Some(status) => write!(f, "HTTP {status}: {}", self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

/// Server verdict on a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted { message: String },
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// App launched: probe the server and look for a job already running.
    Initialize,
    /// User asked to start a job.
    StartRequested(StartForm),
    StartCompleted(Result<StartOutcome, TransportFailure>),
    /// User asked to interrupt the running job.
    StopRequested,
    StopCompleted(Result<String, TransportFailure>),
    /// User detached; stop polling without touching the remote job.
    StopPolling,
    /// Recurring poll timer fired.
    Tick { generation: Generation },
    StatusFetched {
        generation: Generation,
        result: Result<StatusSnapshot, TransportFailure>,
    },
    /// Delayed stop after a terminal state or a stop request.
    GraceElapsed { generation: Generation },
    /// One-shot status probe issued by [`Msg::Initialize`].
    InitialStatus(Result<StatusSnapshot, TransportFailure>),
    /// Whether the server reports its pipeline executor as available.
    DiagnosticsReported(Result<bool, TransportFailure>),
    NoOp,
}
