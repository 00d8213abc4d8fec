use std::time::Duration;

use crate::{StatusMarkers, DEFAULT_LEDGER_CAPACITY};

/// Timing and limits of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Keep polling this long after a terminal state to catch trailing lines.
    pub terminal_grace: Duration,
    /// Keep polling this long after the server acknowledged a stop request.
    pub stop_grace: Duration,
    /// Consecutive transport failures that trip the circuit breaker.
    pub max_consecutive_errors: u32,
    pub ledger_capacity: usize,
    pub markers: StatusMarkers,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            terminal_grace: Duration::from_secs(10),
            stop_grace: Duration::from_secs(15),
            max_consecutive_errors: 5,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            markers: StatusMarkers::default(),
        }
    }
}
