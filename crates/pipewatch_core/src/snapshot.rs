use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One status payload reported by the orchestrator at a point in time.
///
/// Decoding never fails on a well-formed JSON object: missing, `null` or
/// wrongly typed fields fall back to their defaults so that a partially
/// broken server response still yields a usable snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, deserialize_with = "truthy")]
    pub running: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub error: bool,
    #[serde(default, deserialize_with = "loose_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "loose_int")]
    pub step: Option<i64>,
    #[serde(default, deserialize_with = "loose_int")]
    pub total_steps: Option<i64>,
    /// Server log, prefix-growing within one job run. Non-string items are
    /// kept as `None` so they still count toward the log length.
    #[serde(default, deserialize_with = "loose_log")]
    pub log: Option<Vec<Option<String>>>,
    /// Seconds since the job started.
    #[serde(default, deserialize_with = "loose_float")]
    pub elapsed_time: Option<f64>,
    /// Seconds since the job last reported activity.
    #[serde(default, deserialize_with = "loose_float")]
    pub time_since_last_activity: Option<f64>,
}

impl StatusSnapshot {
    /// A snapshot reporting an active job.
    pub fn running(message: impl Into<String>) -> Self {
        Self {
            running: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A snapshot reporting no active job.
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A snapshot reporting a failed (or refused) job.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_steps(mut self, step: i64, total_steps: i64) -> Self {
        self.step = Some(step);
        self.total_steps = Some(total_steps);
        self
    }

    pub fn with_log<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log = Some(lines.into_iter().map(|line| Some(line.into())).collect());
        self
    }

    pub fn log_lines(&self) -> Option<&[Option<String>]> {
        self.log.as_deref()
    }
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn loose_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn loose_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn loose_log<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Option<String>>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(line) => Some(line),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::StatusSnapshot;

    #[test]
    fn decodes_full_payload() {
        let json = r#"{
            "running": true, "error": false, "message": "Progresso",
            "step": 2, "total_steps": 10, "log": ["[INFO] a"],
            "log_sequence": 1, "elapsed_time": 12.5, "start_time": 1700000000.0
        }"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.running);
        assert_eq!(snapshot.step, Some(2));
        assert_eq!(snapshot.total_steps, Some(10));
        assert_eq!(snapshot.log, Some(vec![Some("[INFO] a".to_string())]));
        assert_eq!(snapshot.elapsed_time, Some(12.5));
    }

    #[test]
    fn tolerates_nulls_and_wrong_types() {
        let json = r#"{
            "running": null, "error": 1, "message": null,
            "step": "3", "total_steps": null, "log": "not a list"
        }"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert!(!snapshot.running);
        assert!(snapshot.error);
        assert_eq!(snapshot.message, None);
        assert_eq!(snapshot.step, Some(3));
        assert_eq!(snapshot.total_steps, None);
        assert_eq!(snapshot.log, None);
    }

    #[test]
    fn non_string_log_items_keep_their_slot() {
        let json = r#"{ "log": ["one", 2, null, "four"] }"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        let lines = snapshot.log_lines().unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], None);
        assert_eq!(lines[3].as_deref(), Some("four"));
    }

    #[test]
    fn empty_object_is_default() {
        let snapshot: StatusSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, StatusSnapshot::default());
    }
}
