use std::fmt;

use pipewatch_core::{Generation, StatusSnapshot};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The poll ticker fired.
    Tick { generation: Generation },
    StatusFetched {
        generation: Generation,
        result: Result<StatusSnapshot, ApiError>,
    },
    InitialStatus(Result<StatusSnapshot, ApiError>),
    StartCompleted(Result<StartReply, ApiError>),
    StopCompleted(Result<String, ApiError>),
    Diagnostics(Result<DiagnosticsReport, ApiError>),
    /// A delayed stop scheduled with `ScheduleStop` is due.
    GraceElapsed { generation: Generation },
}

/// Server answer to `POST /start_pipeline`, including refusals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReply {
    pub accepted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub executor_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The body was not the JSON document the endpoint promises.
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}
