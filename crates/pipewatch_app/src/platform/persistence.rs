use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use pipewatch_engine::write_atomically;
use serde::{Deserialize, Serialize};

use super::ui::theme::Theme;

const PREFERENCES_FILENAME: &str = "preferences.ron";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Preferences {
    theme: Theme,
}

pub(crate) fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pipewatch")
}

pub(crate) fn preferences_path() -> PathBuf {
    data_dir().join(PREFERENCES_FILENAME)
}

/// Falls back to the default theme when the file is missing or unreadable.
pub(crate) fn load_theme(path: &Path) -> Theme {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Theme::default();
        }
        Err(err) => {
            engine_warn!("Failed to read preferences from {:?}: {}", path, err);
            return Theme::default();
        }
    };

    match ron::from_str::<Preferences>(&content) {
        Ok(preferences) => preferences.theme,
        Err(err) => {
            engine_warn!("Failed to parse preferences from {:?}: {}", path, err);
            Theme::default()
        }
    }
}

pub(crate) fn save_theme(path: &Path, theme: Theme) -> bool {
    let preferences = Preferences { theme };
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&preferences, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize preferences: {}", err);
            return false;
        }
    };

    match write_atomically(path, &content) {
        Ok(()) => {
            engine_info!("Saved theme {} to {:?}", theme, path);
            true
        }
        Err(err) => {
            engine_error!("Failed to write preferences to {:?}: {}", path, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{load_theme, save_theme};
    use crate::platform::ui::theme::Theme;

    #[test]
    fn theme_round_trips_through_the_preferences_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pipewatch").join("preferences.ron");

        assert_eq!(load_theme(&path), Theme::Dark);
        assert!(save_theme(&path, Theme::Light));
        assert_eq!(load_theme(&path), Theme::Light);
    }

    #[test]
    fn corrupt_preferences_fall_back_to_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("preferences.ron");
        fs::write(&path, "not ron at all (").unwrap();
        assert_eq!(load_theme(&path), Theme::default());
    }
}
