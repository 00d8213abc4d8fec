//! Pipewatch core: pure polling state machine, log ledger and status reduction.
//!
//! Nothing in this crate performs IO. The app feeds [`Msg`] values into
//! [`update`] and executes the returned [`Effect`]s.
mod effect;
mod form;
mod ledger;
mod msg;
mod reconciler;
mod reducer;
mod settings;
mod snapshot;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use form::{RunType, StartForm, StartRequest, ValidationError};
pub use ledger::{
    DedupKey, Ledger, LedgerDelta, LogEntry, NewEntry, Severity, DEDUP_BUCKET_MS,
    DEDUP_TEXT_CHARS, DEFAULT_LEDGER_CAPACITY,
};
pub use msg::{Generation, Msg, StartOutcome, TransportFailure};
pub use reconciler::{classify_severity, reconcile, strip_server_prefix, LedgerOp, Reconciliation};
pub use reducer::{
    reduce, Progress, StatusMarkers, StepCount, TerminalClassifier, TerminalKind, UiState,
    INDETERMINATE_PERCENT,
};
pub use settings::PollSettings;
pub use snapshot::StatusSnapshot;
pub use state::{AppState, PollPhase};
pub use update::update;
pub use view_model::AppViewModel;
