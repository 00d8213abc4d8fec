use chrono::{DateTime, Utc};
use pipewatch_core::{DedupKey, Ledger, NewEntry, Severity, DEFAULT_LEDGER_CAPACITY};
use pretty_assertions::assert_eq;

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000 + millis).unwrap()
}

fn texts(ledger: &Ledger) -> Vec<String> {
    ledger.entries().map(|entry| entry.text.clone()).collect()
}

#[test]
fn appending_same_unforced_entry_twice_is_idempotent() {
    let mut ledger = Ledger::default();
    let entry = NewEntry::local(Severity::Info, "hello", at(0));

    let first = ledger.append([entry.clone()]);
    assert_eq!(first.added.len(), 1);
    assert_eq!(ledger.len(), 1);

    let second = ledger.append([entry]);
    assert!(second.is_empty());
    assert_eq!(ledger.len(), 1);
}

#[test]
fn forced_entries_are_admitted_despite_matching_key() {
    let mut ledger = Ledger::default();
    ledger.append([NewEntry::forced(Severity::Info, "repeat", at(0))]);
    ledger.append([NewEntry::forced(Severity::Info, "repeat", at(10))]);

    assert_eq!(texts(&ledger), vec!["repeat", "repeat"]);
    let seqs: Vec<u64> = ledger.entries().map(|entry| entry.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[test]
fn key_uses_time_bucket_and_first_fifty_chars() {
    let long_a = format!("{}{}", "x".repeat(50), "tail-a");
    let long_b = format!("{}{}", "x".repeat(50), "tail-b");
    assert_eq!(DedupKey::derive(at(0), &long_a), DedupKey::derive(at(999), &long_b));
    assert_ne!(DedupKey::derive(at(0), "same"), DedupKey::derive(at(1_000), "same"));
}

#[test]
fn eviction_keeps_capacity_and_drops_oldest_first() {
    let mut ledger = Ledger::default();
    for i in 0..250 {
        let delta = ledger.append([NewEntry::local(Severity::Info, format!("line {i}"), at(i))]);
        assert!(ledger.len() <= DEFAULT_LEDGER_CAPACITY);
        if i >= 200 {
            assert_eq!(delta.evicted, vec![(i - 199) as u64]);
        }
    }

    assert_eq!(ledger.len(), DEFAULT_LEDGER_CAPACITY);
    let first = ledger.entries().next().unwrap();
    assert_eq!(first.text, "line 50");
    let last = ledger.entries().last().unwrap();
    assert_eq!(last.text, "line 249");
}

#[test]
fn eviction_releases_the_dedup_key() {
    let mut ledger = Ledger::new(2);
    let oldest = NewEntry::local(Severity::Info, "oldest", at(0));
    ledger.append([oldest.clone()]);
    ledger.append([NewEntry::local(Severity::Info, "b", at(1))]);
    ledger.append([NewEntry::local(Severity::Info, "c", at(2))]);

    let key = DedupKey::derive(oldest.observed_at, &oldest.text);
    assert!(!ledger.contains_key(&key));

    ledger.append([oldest]);
    assert_eq!(texts(&ledger), vec!["c", "oldest"]);
}

#[test]
fn evicting_one_forced_duplicate_keeps_the_key_present() {
    let mut ledger = Ledger::new(2);
    ledger.append([NewEntry::forced(Severity::Info, "dup", at(0))]);
    ledger.append([NewEntry::forced(Severity::Info, "dup", at(0))]);
    ledger.append([NewEntry::forced(Severity::Info, "other", at(0))]);

    assert!(ledger.contains_key(&DedupKey::derive(at(0), "dup")));
    let delta = ledger.append([NewEntry::local(Severity::Info, "dup", at(0))]);
    assert!(delta.is_empty());
}

#[test]
fn entry_added_and_evicted_in_one_batch_is_not_reported() {
    let mut ledger = Ledger::new(2);
    let delta =
        ledger.append((0..5).map(|i| NewEntry::forced(Severity::Info, format!("{i}"), at(i))));

    let added: Vec<&str> = delta.added.iter().map(|entry| entry.text.as_str()).collect();
    assert_eq!(added, vec!["3", "4"]);
    assert!(delta.evicted.is_empty());
}

#[test]
fn clear_empties_entries_keys_and_sequence() {
    let mut ledger = Ledger::default();
    ledger.append([NewEntry::local(Severity::Warning, "before", at(0))]);

    let delta = ledger.clear();
    assert!(delta.cleared);
    assert!(ledger.is_empty());
    assert!(!ledger.contains_key(&DedupKey::derive(at(0), "before")));

    ledger.append([NewEntry::local(Severity::Warning, "before", at(0))]);
    assert_eq!(ledger.entries().next().unwrap().seq, 1);
}

#[test]
fn merged_delta_after_clear_only_reports_new_entries() {
    let mut ledger = Ledger::default();
    let mut delta = ledger.append([NewEntry::local(Severity::Info, "old", at(0))]);
    delta.merge(ledger.clear());
    delta.merge(ledger.append([NewEntry::local(Severity::Info, "new", at(5_000))]));

    assert!(delta.cleared);
    let added: Vec<&str> = delta.added.iter().map(|entry| entry.text.as_str()).collect();
    assert_eq!(added, vec!["new"]);
}
