use std::fmt;

use crossterm::style::Color;
use pipewatch_core::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn severity_color(self, severity: Severity) -> Color {
        match (self, severity) {
            (_, Severity::Error | Severity::Critical) => Color::Red,
            (Theme::Dark, Severity::Warning) => Color::Yellow,
            (Theme::Light, Severity::Warning) => Color::DarkYellow,
            (Theme::Dark, Severity::Success) => Color::Green,
            (Theme::Light, Severity::Success) => Color::DarkGreen,
            (Theme::Dark, Severity::Progress) => Color::Cyan,
            (Theme::Light, Severity::Progress) => Color::DarkCyan,
            (Theme::Dark, Severity::Debug) => Color::DarkGrey,
            (Theme::Light, Severity::Debug) => Color::Grey,
            (Theme::Dark, Severity::Info) => Color::White,
            (Theme::Light, Severity::Info) => Color::Black,
        }
    }

    pub fn muted(self) -> Color {
        match self {
            Theme::Dark => Color::DarkGrey,
            Theme::Light => Color::Grey,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}
