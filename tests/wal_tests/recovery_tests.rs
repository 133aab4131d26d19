//! Tests for startup replay and offline verification
//!
//! These tests verify:
//! - Replay rebuilds the store and starts the writer
//! - New writes continue the replayed sequence
//! - Integrity errors abort recovery with the writer stopped
//! - Offline verification reports the first problem

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use tlogkv::config::WalSyncStrategy;
use tlogkv::store::{KeyValueStore, MemoryStore};
use tlogkv::wal::{FileTransactionLog, SequenceCheck, TransactionLog, WalRecovery};
use tlogkv::TlogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("transaction.log");
    (temp_dir, log_path)
}

fn open_log(path: &Path) -> FileTransactionLog {
    FileTransactionLog::open(path, WalSyncStrategy::EveryWrite).unwrap()
}

/// Store that refuses every mutation
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn put(&self, _key: &str, _value: &str) -> tlogkv::Result<()> {
        Err(TlogError::InvalidState("store is read-only".to_string()))
    }

    fn get(&self, _key: &str) -> tlogkv::Result<String> {
        Err(TlogError::KeyNotFound)
    }

    fn delete(&self, _key: &str) -> tlogkv::Result<()> {
        Err(TlogError::InvalidState("store is read-only".to_string()))
    }
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_log() {
    let (_temp, log_path) = setup_temp_log();
    let log = open_log(&log_path);
    let store = MemoryStore::new();

    let result = WalRecovery::recover(&log, &store).unwrap();

    assert_eq!(result.events_replayed, 0);
    assert_eq!(result.last_sequence, 0);
    assert!(store.is_empty());
    assert!(log.is_running());

    log.close().unwrap();
}

#[test]
fn test_recover_rebuilds_store() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t1\tb\t2\n3\t0\ta\t\n").unwrap();

    let log = open_log(&log_path);
    let store = MemoryStore::new();
    let result = WalRecovery::recover(&log, &store).unwrap();

    assert_eq!(result.events_replayed, 3);
    assert_eq!(result.puts, 2);
    assert_eq!(result.deletes, 1);
    assert_eq!(result.last_sequence, 3);

    assert!(matches!(store.get("a"), Err(TlogError::KeyNotFound)));
    assert_eq!(store.get("b").unwrap(), "2");
    assert_eq!(store.len(), 1);

    log.close().unwrap();
}

#[test]
fn test_writes_after_recovery_continue_sequence() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t1\tb\t2\n").unwrap();

    let log = open_log(&log_path);
    let store = MemoryStore::new();
    WalRecovery::recover(&log, &store).unwrap();

    log.write_delete("a").unwrap();
    log.close().unwrap();

    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "1\t1\ta\t1\n2\t1\tb\t2\n3\t0\ta\t\n"
    );
}

#[test]
fn test_recover_is_repeatable_across_restarts() {
    let (_temp, log_path) = setup_temp_log();

    {
        let log = open_log(&log_path);
        WalRecovery::recover(&log, &MemoryStore::new()).unwrap();
        log.write_put("a", "1").unwrap();
        log.write_put("b", "2").unwrap();
        log.write_delete("a").unwrap();
        log.close().unwrap();
    }

    let log = open_log(&log_path);
    let store = MemoryStore::new();
    let result = WalRecovery::recover(&log, &store).unwrap();

    assert_eq!(result.events_replayed, 3);
    let expected: BTreeMap<String, String> = [("b".to_string(), "2".to_string())].into();
    assert_eq!(store.snapshot(), expected);

    log.close().unwrap();
}

#[test]
fn test_recover_stops_on_sequence_error() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t1\tb\t2\n2\t1\tc\t3\n").unwrap();

    let log = open_log(&log_path);
    let store = MemoryStore::new();
    let result = WalRecovery::recover(&log, &store);

    assert!(matches!(result, Err(TlogError::Sequence { line: 3, previous: 2, found: 2 })));
    assert!(!log.is_running());
    assert!(matches!(log.write_put("x", "y"), Err(TlogError::NotRunning)));

    // Events before the bad line were applied, nothing after
    assert_eq!(store.len(), 2);
    assert!(matches!(store.get("c"), Err(TlogError::KeyNotFound)));
}

#[test]
fn test_recover_stops_on_parse_error() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\nbroken\n").unwrap();

    let log = open_log(&log_path);
    let result = WalRecovery::recover(&log, &MemoryStore::new());

    assert!(matches!(result, Err(TlogError::Parse { line: 2, .. })));
    assert!(!log.is_running());
}

#[test]
fn test_recover_rejects_torn_tail() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t1\tb\t").unwrap();

    let log = open_log(&log_path);
    let result = WalRecovery::recover(&log, &MemoryStore::new());

    assert!(matches!(result, Err(TlogError::Parse { line: 2, .. })));

    // Failed recovery leaves the file untouched
    log.close().unwrap();
    assert_eq!(fs::read_to_string(&log_path).unwrap(), "1\t1\ta\t1\n2\t1\tb\t");
}

#[test]
fn test_recover_propagates_store_errors() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n").unwrap();

    let log = open_log(&log_path);
    let result = WalRecovery::recover(&log, &ReadOnlyStore);

    assert!(matches!(result, Err(TlogError::InvalidState(_))));
    assert!(!log.is_running());
}

#[test]
fn test_recover_after_run_is_rejected() {
    let (_temp, log_path) = setup_temp_log();
    let log = open_log(&log_path);
    log.run().unwrap();

    let result = WalRecovery::recover(&log, &MemoryStore::new());

    assert!(matches!(result, Err(TlogError::InvalidState(_))));
    log.close().unwrap();
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_log() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t1\tb\t2\n3\t0\ta\t\n").unwrap();

    let result = WalRecovery::verify(&log_path, SequenceCheck::Contiguous).unwrap();

    assert!(result.is_clean());
    assert_eq!(result.events, 3);
    assert_eq!(result.last_sequence, 3);
}

#[test]
fn test_verify_gap_depends_on_check() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n4\t1\tb\t2\n").unwrap();

    let monotonic = WalRecovery::verify(&log_path, SequenceCheck::Monotonic).unwrap();
    assert!(monotonic.is_clean());
    assert_eq!(monotonic.events, 2);

    let contiguous = WalRecovery::verify(&log_path, SequenceCheck::Contiguous).unwrap();
    assert!(!contiguous.is_clean());
    assert_eq!(contiguous.events, 1);
    assert_eq!(contiguous.last_sequence, 1);
    assert!(matches!(
        contiguous.error,
        Some(TlogError::Sequence { line: 2, previous: 1, found: 4 })
    ));
}

#[test]
fn test_verify_reports_parse_error() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t1\ta\t1\n2\t9\tb\t2\n").unwrap();

    let result = WalRecovery::verify(&log_path, SequenceCheck::Monotonic).unwrap();

    assert_eq!(result.events, 1);
    let error = result.error.unwrap();
    assert!(error.is_integrity_error());
    assert!(matches!(error, TlogError::Parse { line: 2, .. }));
}

#[test]
fn test_verify_missing_file() {
    let (_temp, log_path) = setup_temp_log();

    let result = WalRecovery::verify(&log_path, SequenceCheck::Monotonic);

    assert!(matches!(result, Err(TlogError::Io(_))));
}

// =============================================================================
// Property Tests
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Put(String, String),
    Delete(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = "[a-e]{1,3}";
    prop_oneof![
        (key, "[a-z0-9 ]{0,8}").prop_map(|(k, v)| Op::Put(k, v)),
        key.prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Replaying what was logged reproduces the state the writes produced
    #[test]
    fn prop_replay_matches_applied_state(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let (_temp, log_path) = setup_temp_log();
        let mut expected = HashMap::new();

        {
            let log = open_log(&log_path);
            log.run().unwrap();
            for op in &ops {
                match op {
                    Op::Put(k, v) => {
                        log.write_put(k, v).unwrap();
                        expected.insert(k.clone(), v.clone());
                    }
                    Op::Delete(k) => {
                        log.write_delete(k).unwrap();
                        expected.remove(k);
                    }
                }
            }
            log.close().unwrap();
        }

        let log = open_log(&log_path);
        let store = MemoryStore::new();
        let result = WalRecovery::recover(&log, &store).unwrap();
        log.close().unwrap();

        prop_assert_eq!(result.events_replayed, ops.len() as u64);
        prop_assert_eq!(result.last_sequence, ops.len() as u64);
        let expected: BTreeMap<String, String> = expected.into_iter().collect();
        prop_assert_eq!(store.snapshot(), expected);
    }
}
