use std::io::{self, Write};

use chrono::Local;
use crossterm::style::{Color, Stylize};
use engine_logging::engine_warn;
use pipewatch_core::{AppViewModel, LedgerDelta, LogEntry, PollPhase};

use super::theme::Theme;

/// Writes ledger entries and status changes to stdout.
pub struct Renderer {
    theme: Theme,
    last_status: Option<String>,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            last_status: None,
        }
    }

    pub fn render_log(&mut self, delta: &LedgerDelta) {
        let mut out = io::stdout().lock();
        if delta.cleared {
            let rule = "--- log cleared ---".with(self.theme.muted());
            emit(&mut out, format_args!("{rule}"));
        }
        for entry in &delta.added {
            let color = self.theme.severity_color(entry.severity);
            let line = entry_line(entry).with(color);
            emit(&mut out, format_args!("{line}"));
        }
    }

    /// Prints the status line if it differs from the last one printed.
    pub fn render_view(&mut self, view: &AppViewModel) {
        let line = status_line(view);
        if self.last_status.as_deref() == Some(line.as_str()) {
            return;
        }
        let styled = line.clone().with(state_color(view.state_label, self.theme)).bold();
        emit(&mut io::stdout().lock(), format_args!("{styled}"));
        self.last_status = Some(line);
    }
}

fn emit(out: &mut impl Write, line: std::fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{line}") {
        engine_warn!("Failed to write to stdout: {}", err);
    }
}

fn state_color(label: &str, theme: Theme) -> Color {
    match label {
        "running" => Color::Cyan,
        "succeeded" => Color::Green,
        "failed" => Color::Red,
        "stopped" => Color::Yellow,
        _ => theme.muted(),
    }
}

pub fn entry_line(entry: &LogEntry) -> String {
    let local = entry.observed_at.with_timezone(&Local);
    format!("[{}] {}", local.format("%H:%M:%S"), entry.text)
}

pub fn status_line(view: &AppViewModel) -> String {
    let mut line = format!(
        "[{}] {}/{} ({:.0}%) {}",
        view.state_label,
        view.progress.current,
        view.progress.total,
        view.progress.percent,
        view.message
    );
    if let Some(elapsed) = view.elapsed_secs {
        line.push_str(&format!(" | elapsed {}", format_secs(elapsed)));
    }
    if let Some(idle) = view.idle_secs {
        line.push_str(&format!(" | idle {}", format_secs(idle)));
    }
    if view.consecutive_errors > 0 {
        line.push_str(&format!(" | {} failed polls", view.consecutive_errors));
    }
    if view.phase == PollPhase::Stopping {
        line.push_str(" | finishing");
    }
    line
}

fn format_secs(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use pipewatch_core::{AppViewModel, PollPhase, Progress, StepCount};
    use pretty_assertions::assert_eq;

    use super::{format_secs, status_line};

    fn view() -> AppViewModel {
        AppViewModel {
            phase: PollPhase::Polling,
            state_label: "running",
            message: "Step 3/10".to_string(),
            progress: Progress {
                percent: 30.0,
                current: StepCount::Known(3),
                total: StepCount::Known(10),
            },
            elapsed_secs: Some(75.2),
            idle_secs: None,
            consecutive_errors: 0,
            start_enabled: false,
            stop_enabled: true,
            log_len: 4,
            dirty: true,
        }
    }

    #[test]
    fn status_line_shows_progress_and_elapsed() {
        assert_eq!(
            status_line(&view()),
            "[running] 3/10 (30%) Step 3/10 | elapsed 1m 15s"
        );
    }

    #[test]
    fn unknown_steps_and_failures_are_shown() {
        let mut view = view();
        view.progress = Progress {
            percent: 10.0,
            current: StepCount::Unknown,
            total: StepCount::Unknown,
        };
        view.elapsed_secs = None;
        view.consecutive_errors = 2;
        view.phase = PollPhase::Stopping;
        assert_eq!(
            status_line(&view),
            "[running] ?/? (10%) Step 3/10 | 2 failed polls | finishing"
        );
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_secs(9.4), "9s");
        assert_eq!(format_secs(125.0), "2m 05s");
        assert_eq!(format_secs(3_725.0), "1h 02m 05s");
        assert_eq!(format_secs(-3.0), "0s");
    }
}
