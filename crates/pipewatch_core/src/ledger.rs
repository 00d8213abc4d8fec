use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};

pub const DEFAULT_LEDGER_CAPACITY: usize = 200;
/// Width of the timestamp bucket that participates in the dedup key.
pub const DEDUP_BUCKET_MS: i64 = 1_000;
/// Number of leading characters of the text that participate in the dedup key.
pub const DEDUP_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Critical,
    Debug,
    Progress,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Debug => "debug",
            Severity::Progress => "progress",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity used to detect structural duplicates inside the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    bucket: i64,
    prefix: String,
}

impl DedupKey {
    pub fn derive(observed_at: DateTime<Utc>, text: &str) -> Self {
        Self {
            bucket: observed_at.timestamp_millis().div_euclid(DEDUP_BUCKET_MS),
            prefix: text.chars().take(DEDUP_TEXT_CHARS).collect(),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.bucket, self.prefix)
    }
}

/// An entry offered to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub severity: Severity,
    pub text: String,
    pub observed_at: DateTime<Utc>,
    /// Admit even when an entry with the same key is present.
    pub forced: bool,
}

impl NewEntry {
    /// A locally generated entry, dropped if an identical one is present.
    pub fn local(severity: Severity, text: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            severity,
            text: text.into(),
            observed_at,
            forced: false,
        }
    }

    /// An entry that is always admitted.
    pub fn forced(severity: Severity, text: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            forced: true,
            ..Self::local(severity, text, observed_at)
        }
    }
}

/// An admitted entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub seq: u64,
    pub key: DedupKey,
    pub severity: Severity,
    pub text: String,
    pub observed_at: DateTime<Utc>,
}

/// Net change produced by ledger mutations, reported to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerDelta {
    /// The ledger was emptied before `added` were appended.
    pub cleared: bool,
    pub added: Vec<LogEntry>,
    /// Sequence numbers of previously reported entries that were evicted.
    pub evicted: Vec<u64>,
}

impl LedgerDelta {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.added.is_empty() && self.evicted.is_empty()
    }

    /// Folds a later delta into this one.
    pub fn merge(&mut self, later: LedgerDelta) {
        if later.cleared {
            *self = later;
            return;
        }
        for seq in later.evicted {
            self.record_eviction(seq);
        }
        self.added.extend(later.added);
    }

    fn record_eviction(&mut self, seq: u64) {
        if let Some(position) = self.added.iter().position(|entry| entry.seq == seq) {
            self.added.remove(position);
        } else {
            self.evicted.push(seq);
        }
    }
}

/// Bounded, ordered, deduplicated log buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    capacity: usize,
    next_seq: u64,
    entries: VecDeque<LogEntry>,
    // Multiset: forced entries may share a key.
    keys: HashMap<DedupKey, usize>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

impl Ledger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 1,
            entries: VecDeque::with_capacity(capacity),
            keys: HashMap::new(),
        }
    }

    pub fn append(&mut self, entries: impl IntoIterator<Item = NewEntry>) -> LedgerDelta {
        let mut delta = LedgerDelta::default();
        for entry in entries {
            let key = DedupKey::derive(entry.observed_at, &entry.text);
            if !entry.forced && self.keys.contains_key(&key) {
                continue;
            }
            *self.keys.entry(key.clone()).or_insert(0) += 1;

            let admitted = LogEntry {
                seq: self.next_seq,
                key,
                severity: entry.severity,
                text: entry.text,
                observed_at: entry.observed_at,
            };
            self.next_seq += 1;
            self.entries.push_back(admitted.clone());
            delta.added.push(admitted);

            while self.entries.len() > self.capacity {
                let Some(oldest) = self.entries.pop_front() else {
                    break;
                };
                self.release_key(&oldest.key);
                delta.record_eviction(oldest.seq);
            }
        }
        delta
    }

    pub fn clear(&mut self) -> LedgerDelta {
        self.entries.clear();
        self.keys.clear();
        self.next_seq = 1;
        LedgerDelta {
            cleared: true,
            ..LedgerDelta::default()
        }
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + DoubleEndedIterator {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains_key(&self, key: &DedupKey) -> bool {
        self.keys.contains_key(key)
    }

    fn release_key(&mut self, key: &DedupKey) {
        if let Some(count) = self.keys.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.keys.remove(key);
            }
        }
    }
}
