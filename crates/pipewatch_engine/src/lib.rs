//! Pipewatch engine: HTTP transport to the orchestrator and timer scheduling.
mod api;
mod engine;
mod persist;
mod types;

pub use api::{ApiSettings, PipelineApi, ReqwestPipelineApi};
pub use engine::{EngineError, EngineEvents, EngineHandle};
pub use persist::{ensure_dir, write_atomically, PersistError};
pub use types::{ApiError, DiagnosticsReport, EngineEvent, FailureKind, StartReply};
