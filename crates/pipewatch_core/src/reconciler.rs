use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{Ledger, LedgerDelta, NewEntry, Severity};


/// Checked in order; the first tag found decides.
const SEVERITY_TAGS: &[(&str, Severity)] = &[
    ("[ERROR]", Severity::Error),
    ("[CRITICAL]", Severity::Error),
    ("[WARNING]", Severity::Warning),
    ("[SUCCESS]", Severity::Success),
    ("[DEBUG]", Severity::Debug),
    ("[PROGRESS]", Severity::Progress),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Clear,
    Append(Vec<NewEntry>),
}

/// Outcome of folding one snapshot's log into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub cursor: usize,
    pub ops: Vec<LedgerOp>,
}

impl Reconciliation {
    pub fn reset_detected(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, LedgerOp::Clear))
    }

    pub fn apply(self, ledger: &mut Ledger) -> LedgerDelta {
        let mut delta = LedgerDelta::default();
        for op in self.ops {
            match op {
                LedgerOp::Clear => delta.merge(ledger.clear()),
                LedgerOp::Append(entries) => delta.merge(ledger.append(entries)),
            }
        }
        delta
    }
}

/// Maps the server log onto incremental ledger operations.
///
/// `cursor` is the number of server lines already folded in. A log shorter
/// than the cursor means the server started a new run.
pub fn reconcile(
    log: Option<&[Option<String>]>,
    cursor: usize,
    observed_at: DateTime<Utc>,
) -> Reconciliation {
    let Some(lines) = log else {
        return Reconciliation {
            cursor,
            ops: Vec::new(),
        };
    };

    let mut ops = Vec::new();
    let mut start = cursor;
    if lines.len() < cursor {
        ops.push(LedgerOp::Clear);
        start = 0;
    }

    let fresh: Vec<NewEntry> = lines[start..]
        .iter()
        .filter_map(|line| line.as_deref())
        .filter_map(|raw| entry_from_line(raw, observed_at))
        .collect();
    if !fresh.is_empty() {
        ops.push(LedgerOp::Append(fresh));
    }

    Reconciliation {
        cursor: lines.len(),
        ops,
    }
}

pub fn classify_severity(line: &str) -> Severity {
    SEVERITY_TAGS
        .iter()
        .find(|(tag, _)| line.contains(tag))
        .map_or(Severity::Info, |(_, severity)| *severity)
}

/// `[2024-05-01 10:00:00] [INFO] ` as written by the orchestrator; either part may be missing.
fn server_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^(?:\[[\d\-\s:]+\]\s*)?(?:\[[A-Z]+\]\s*)?").expect("server prefix pattern")
    })
}

pub fn strip_server_prefix(line: &str) -> &str {
    match server_prefix().find(line) {
        Some(prefix) => &line[prefix.end()..],
        None => line,
    }
}

fn entry_from_line(raw: &str, observed_at: DateTime<Utc>) -> Option<NewEntry> {
    if raw.trim().is_empty() {
        return None;
    }
    let text = strip_server_prefix(raw).trim_end();
    if text.trim().is_empty() {
        return None;
    }
    Some(NewEntry::forced(
        classify_severity(raw),
        text,
        observed_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::{classify_severity, strip_server_prefix};
    use crate::Severity;

    #[test]
    fn strips_timestamp_and_tag() {
        assert_eq!(
            strip_server_prefix("[2024-05-01 10:00:00] [INFO] Avvio pipeline"),
            "Avvio pipeline"
        );
        assert_eq!(strip_server_prefix("[ERROR] b"), "b");
        assert_eq!(strip_server_prefix("[12:00:01] tick"), "tick");
    }

    #[test]
    fn leaves_unprefixed_lines_alone() {
        assert_eq!(strip_server_prefix("plain text"), "plain text");
        assert_eq!(strip_server_prefix("[lowercase] kept"), "[lowercase] kept");
    }

    #[test]
    fn critical_maps_to_error() {
        assert_eq!(classify_severity("[x] [CRITICAL] boom"), Severity::Error);
        assert_eq!(classify_severity("[x] [PROGRESS] Step 1/3"), Severity::Progress);
        assert_eq!(classify_severity("no tag"), Severity::Info);
    }
}
