use std::fmt;

use serde::{Deserialize, Serialize};

use crate::StatusSnapshot;

/// Progress shown while a job runs without a known step total.
pub const INDETERMINATE_PERCENT: f32 = 10.0;

const DEFAULT_IDLE_MESSAGE: &str = "Waiting...";
const DEFAULT_RUNNING_MESSAGE: &str = "Running...";
const DEFAULT_FAILED_MESSAGE: &str = "The pipeline reported an error.";

/// Terminal outcome inferred from the server's free-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Succeeded,
    Stopped,
}

/// Decides whether a non-running, non-error message means success or interruption.
///
/// The orchestrator only reports these outcomes as human-readable text, so the
/// policy is kept behind this trait and can be replaced once a structured
/// status code exists.
pub trait TerminalClassifier {
    fn classify(&self, message: &str) -> Option<TerminalKind>;
}

/// Case-insensitive substring markers for terminal outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusMarkers {
    pub success: Vec<String>,
    pub stopped: Vec<String>,
}

impl Default for StatusMarkers {
    fn default() -> Self {
        Self {
            success: vec!["successo".to_string(), "completed successfully".to_string()],
            stopped: vec!["interrott".to_string(), "interrupted".to_string()],
        }
    }
}

impl TerminalClassifier for StatusMarkers {
    fn classify(&self, message: &str) -> Option<TerminalKind> {
        let haystack = message.to_lowercase();
        let matches = |markers: &[String]| {
            markers
                .iter()
                .filter(|marker| !marker.is_empty())
                .any(|marker| haystack.contains(&marker.to_lowercase()))
        };
        if matches(&self.success) {
            Some(TerminalKind::Succeeded)
        } else if matches(&self.stopped) {
            Some(TerminalKind::Stopped)
        } else {
            None
        }
    }
}

/// Discrete UI state derived from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiState {
    Idle { message: String },
    Running { step: i64, total: i64, message: String },
    Succeeded { total: i64, message: String },
    Stopped { message: String },
    Failed { message: String },
}

impl Default for UiState {
    fn default() -> Self {
        UiState::Idle {
            message: DEFAULT_IDLE_MESSAGE.to_string(),
        }
    }
}

impl UiState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UiState::Succeeded { .. } | UiState::Stopped { .. } | UiState::Failed { .. }
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, UiState::Running { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            UiState::Idle { message }
            | UiState::Running { message, .. }
            | UiState::Succeeded { message, .. }
            | UiState::Stopped { message }
            | UiState::Failed { message } => message,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UiState::Idle { .. } => "idle",
            UiState::Running { .. } => "running",
            UiState::Succeeded { .. } => "succeeded",
            UiState::Stopped { .. } => "stopped",
            UiState::Failed { .. } => "failed",
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            UiState::Running { step, total, .. } if *total > 0 => Progress {
                percent: ((*step as f64 / *total as f64) * 100.0).clamp(0.0, 100.0) as f32,
                current: StepCount::Known(*step),
                total: StepCount::Known(*total),
            },
            UiState::Running { .. } => Progress {
                percent: INDETERMINATE_PERCENT,
                current: StepCount::Unknown,
                total: StepCount::Unknown,
            },
            UiState::Succeeded { total, .. } if *total > 0 => Progress {
                percent: 100.0,
                current: StepCount::Known(*total),
                total: StepCount::Known(*total),
            },
            UiState::Succeeded { .. } => Progress {
                percent: 100.0,
                current: StepCount::Unknown,
                total: StepCount::Unknown,
            },
            UiState::Stopped { .. } => Progress {
                percent: 0.0,
                current: StepCount::Unknown,
                total: StepCount::Unknown,
            },
            UiState::Idle { .. } | UiState::Failed { .. } => Progress::zero(),
        }
    }
}

/// Step counter that may be unknown while a job has not reported its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCount {
    Known(i64),
    Unknown,
}

impl fmt::Display for StepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepCount::Known(count) => write!(f, "{count}"),
            StepCount::Unknown => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub percent: f32,
    pub current: StepCount,
    pub total: StepCount,
}

impl Progress {
    pub fn zero() -> Self {
        Self {
            percent: 0.0,
            current: StepCount::Known(0),
            total: StepCount::Known(0),
        }
    }
}

/// Maps a snapshot to its UI state. First matching rule wins.
pub fn reduce(snapshot: &StatusSnapshot, classifier: &impl TerminalClassifier) -> UiState {
    let message = snapshot.message.clone().filter(|m| !m.trim().is_empty());

    if snapshot.running {
        return UiState::Running {
            step: snapshot.step.unwrap_or(0),
            total: snapshot.total_steps.unwrap_or(0),
            message: message.unwrap_or_else(|| DEFAULT_RUNNING_MESSAGE.to_string()),
        };
    }
    if snapshot.error {
        return UiState::Failed {
            message: message.unwrap_or_else(|| DEFAULT_FAILED_MESSAGE.to_string()),
        };
    }

    let Some(message) = message else {
        return UiState::default();
    };
    match classifier.classify(&message) {
        Some(TerminalKind::Succeeded) => UiState::Succeeded {
            total: snapshot.total_steps.unwrap_or(0),
            message,
        },
        Some(TerminalKind::Stopped) => UiState::Stopped { message },
        None => UiState::Idle { message },
    }
}
