use chrono::{DateTime, Utc};

use crate::view_model::AppViewModel;
use crate::{
    reconcile, reduce, Effect, Generation, Ledger, LedgerDelta, NewEntry, PollSettings,
    Severity, StatusSnapshot, UiState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Stopped,
    Polling,
    /// Still polling, with a delayed stop scheduled.
    Stopping,
}

impl PollPhase {
    pub fn is_active(self) -> bool {
        !matches!(self, PollPhase::Stopped)
    }
}

/// Timing fields of the latest snapshot, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct SnapshotTiming {
    pub(crate) elapsed_secs: Option<f64>,
    pub(crate) idle_secs: Option<f64>,
}

/// All mutable state of the poll loop controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    settings: PollSettings,
    phase: PollPhase,
    generation: Generation,
    consecutive_errors: u32,
    cursor: usize,
    ledger: Ledger,
    ui: UiState,
    timing: SnapshotTiming,
    fetch_in_flight: bool,
    start_pending: bool,
    stop_pending: bool,
    initial_status_seen: bool,
    diagnostics_seen: bool,
    outgoing: LedgerDelta,
    dirty: bool,
}

impl AppState {
    pub fn new(settings: PollSettings) -> Self {
        let ledger = Ledger::new(settings.ledger_capacity);
        Self {
            settings,
            ledger,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            state_label: self.ui.label(),
            message: self.ui.message().to_string(),
            progress: self.ui.progress(),
            elapsed_secs: self.timing.elapsed_secs,
            idle_secs: self.timing.idle_secs,
            consecutive_errors: self.consecutive_errors,
            start_enabled: !self.ui.is_running() && !self.start_pending,
            stop_enabled: self.ui.is_running() && !self.stop_pending,
            log_len: self.ledger.len(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn start_pending(&self) -> bool {
        self.start_pending
    }

    pub fn stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// Both startup probes (`/status` and `/debug/pipeline`) have answered.
    pub fn startup_complete(&self) -> bool {
        self.initial_status_seen && self.diagnostics_seen
    }

    /// Not polling and no one-shot request awaiting an answer.
    pub fn is_settled(&self) -> bool {
        !self.phase.is_active() && !self.start_pending && !self.stop_pending
    }

    pub(crate) fn start_polling(&mut self) -> Vec<Effect> {
        if self.phase == PollPhase::Polling {
            return Vec::new();
        }
        self.generation += 1;
        self.consecutive_errors = 0;
        self.cursor = 0;
        self.fetch_in_flight = false;
        self.clear_ledger();
        self.phase = PollPhase::Polling;
        self.dirty = true;
        vec![Effect::StartTicker {
            generation: self.generation,
            interval: self.settings.interval,
        }]
    }

    pub(crate) fn stop_polling(&mut self) -> Vec<Effect> {
        self.consecutive_errors = 0;
        self.fetch_in_flight = false;
        if !self.phase.is_active() {
            return Vec::new();
        }
        self.generation += 1;
        self.phase = PollPhase::Stopped;
        self.dirty = true;
        vec![Effect::CancelTicker]
    }

    /// Enters the grace period unless one is already running.
    pub(crate) fn begin_stopping(&mut self, after: std::time::Duration) -> Vec<Effect> {
        if self.phase != PollPhase::Polling {
            return Vec::new();
        }
        self.phase = PollPhase::Stopping;
        self.dirty = true;
        vec![Effect::ScheduleStop {
            generation: self.generation,
            after,
        }]
    }

    /// Reduces and reconciles a polled snapshot.
    pub(crate) fn apply_snapshot(&mut self, snapshot: &StatusSnapshot, now: DateTime<Utc>) {
        self.show_snapshot(snapshot);
        let reconciliation = reconcile(snapshot.log_lines(), self.cursor, now);
        self.cursor = reconciliation.cursor;
        let delta = reconciliation.apply(&mut self.ledger);
        self.outgoing.merge(delta);
    }

    /// Reduces a snapshot into the UI state without touching the ledger.
    pub(crate) fn show_snapshot(&mut self, snapshot: &StatusSnapshot) {
        let ui = reduce(snapshot, &self.settings.markers);
        let timing = SnapshotTiming {
            elapsed_secs: snapshot.elapsed_time,
            idle_secs: snapshot.time_since_last_activity,
        };
        if ui != self.ui || timing != self.timing {
            self.dirty = true;
        }
        self.ui = ui;
        self.timing = timing;
    }

    pub(crate) fn clear_ledger(&mut self) {
        self.cursor = 0;
        let delta = self.ledger.clear();
        self.outgoing.merge(delta);
    }

    pub(crate) fn log(&mut self, severity: Severity, text: impl Into<String>, now: DateTime<Utc>) {
        self.push(NewEntry::local(severity, text, now));
    }

    pub(crate) fn log_forced(
        &mut self,
        severity: Severity,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.push(NewEntry::forced(severity, text, now));
    }

    fn push(&mut self, entry: NewEntry) {
        let delta = self.ledger.append([entry]);
        self.outgoing.merge(delta);
    }

    pub(crate) fn take_outgoing(&mut self) -> LedgerDelta {
        std::mem::take(&mut self.outgoing)
    }

    pub(crate) fn record_errors(&mut self) -> u32 {
        self.consecutive_errors += 1;
        self.consecutive_errors
    }

    pub(crate) fn reset_errors(&mut self) {
        self.consecutive_errors = 0;
    }

    pub(crate) fn set_fetch_in_flight(&mut self, in_flight: bool) {
        self.fetch_in_flight = in_flight;
    }

    pub(crate) fn set_start_pending(&mut self, pending: bool) {
        self.start_pending = pending;
        self.dirty = true;
    }

    pub(crate) fn set_stop_pending(&mut self, pending: bool) {
        self.stop_pending = pending;
        self.dirty = true;
    }

    pub(crate) fn mark_initial_status_seen(&mut self) {
        self.initial_status_seen = true;
    }

    pub(crate) fn mark_diagnostics_seen(&mut self) {
        self.diagnostics_seen = true;
    }
}
