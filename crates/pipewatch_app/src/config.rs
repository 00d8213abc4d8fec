//! User configuration, read from a RON file.
//!
//! Every field has a default, so a missing file or a file that only sets a
//! few keys is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::engine_info;
use pipewatch_core::{PollSettings, StatusMarkers};
use pipewatch_engine::ApiSettings;
use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.ron";
/// Polling faster than this only loads the orchestrator.
const MIN_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub markers: StatusMarkers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            base_url: api.base_url,
            connect_timeout_ms: api.connect_timeout.as_millis() as u64,
            request_timeout_ms: api.request_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub terminal_grace_ms: u64,
    pub stop_grace_ms: u64,
    pub max_consecutive_errors: u32,
    pub ledger_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let poll = PollSettings::default();
        Self {
            interval_ms: poll.interval.as_millis() as u64,
            terminal_grace_ms: poll.terminal_grace.as_millis() as u64,
            stop_grace_ms: poll.stop_grace.as_millis() as u64,
            max_consecutive_errors: poll.max_consecutive_errors,
            ledger_capacity: poll.ledger_capacity,
        }
    }
}

impl WatchConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pipewatch")
            .join(CONFIG_FILENAME)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config: Self = ron::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.base_url.trim().is_empty() {
            bail!("server.base_url must not be empty");
        }
        if self.polling.interval_ms < MIN_INTERVAL_MS {
            bail!(
                "polling.interval_ms must be at least {MIN_INTERVAL_MS} (got {})",
                self.polling.interval_ms
            );
        }
        if self.polling.max_consecutive_errors == 0 {
            bail!("polling.max_consecutive_errors must be at least 1");
        }
        if self.polling.ledger_capacity == 0 {
            bail!("polling.ledger_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.polling.interval_ms),
            terminal_grace: Duration::from_millis(self.polling.terminal_grace_ms),
            stop_grace: Duration::from_millis(self.polling.stop_grace_ms),
            max_consecutive_errors: self.polling.max_consecutive_errors,
            ledger_capacity: self.polling.ledger_capacity,
            markers: self.markers.clone(),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.server.base_url.clone(),
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.server.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::WatchConfig;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = WatchConfig::load(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(config, WatchConfig::default());
        assert_eq!(config.poll_settings().interval, Duration::from_secs(3));
    }

    #[test]
    fn partial_file_overrides_only_what_it_sets() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ron");
        fs::write(
            &path,
            r#"(
                server: (base_url: "http://orchestrator:8080"),
                polling: (interval_ms: 1000),
                markers: (success: ["done"]),
            )"#,
        )
        .unwrap();

        let config = WatchConfig::load(&path).unwrap();
        assert_eq!(config.server.base_url, "http://orchestrator:8080");
        assert_eq!(config.server.request_timeout_ms, 15_000);

        let poll = config.poll_settings();
        assert_eq!(poll.interval, Duration::from_secs(1));
        assert_eq!(poll.max_consecutive_errors, 5);
        assert_eq!(poll.markers.success, vec!["done".to_string()]);
        assert!(!poll.markers.stopped.is_empty());
    }

    #[test]
    fn too_fast_polling_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ron");
        fs::write(&path, "(polling: (interval_ms: 10))").unwrap();

        let err = WatchConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ron");
        fs::write(&path, "(server: [").unwrap();
        assert!(WatchConfig::load(&path).is_err());
    }
}
