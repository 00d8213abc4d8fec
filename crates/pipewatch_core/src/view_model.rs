use crate::{PollPhase, Progress};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub phase: PollPhase,
    pub state_label: &'static str,
    pub message: String,
    pub progress: Progress,
    pub elapsed_secs: Option<f64>,
    pub idle_secs: Option<f64>,
    pub consecutive_errors: u32,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub log_len: usize,
    pub dirty: bool,
}
