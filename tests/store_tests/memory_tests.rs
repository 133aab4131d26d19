//! MemoryStore Tests
//!
//! Tests verify:
//! - Basic CRUD operations
//! - NotFound semantics
//! - Snapshot / size helpers
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use tlogkv::store::{KeyValueStore, MemoryStore};
use tlogkv::TlogError;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = MemoryStore::new();
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_put_and_get() {
    let store = MemoryStore::new();

    store.put("key1", "value1").unwrap();

    assert_eq!(store.get("key1").unwrap(), "value1");
}

#[test]
fn test_get_nonexistent_key() {
    let store = MemoryStore::new();

    let result = store.get("nonexistent");
    assert!(matches!(result, Err(TlogError::KeyNotFound)));
}

#[test]
fn test_put_overwrites_existing() {
    let store = MemoryStore::new();

    store.put("key1", "value1").unwrap();
    store.put("key1", "value2").unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("key1").unwrap(), "value2");
}

#[test]
fn test_put_empty_value() {
    let store = MemoryStore::new();

    store.put("key", "").unwrap();
    assert_eq!(store.get("key").unwrap(), "");
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_put_get_delete_cycle() {
    let store = MemoryStore::new();

    assert!(matches!(store.get("k"), Err(TlogError::KeyNotFound)));
    store.put("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap(), "v");
    store.delete("k").unwrap();
    assert!(matches!(store.get("k"), Err(TlogError::KeyNotFound)));
    assert!(store.is_empty());
}

#[test]
fn test_delete_nonexistent_key() {
    let store = MemoryStore::new();

    // Should not error
    store.delete("nonexistent").unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_put_after_delete() {
    let store = MemoryStore::new();

    store.put("key1", "value1").unwrap();
    store.delete("key1").unwrap();
    store.put("key1", "value2").unwrap();

    assert_eq!(store.get("key1").unwrap(), "value2");
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_is_sorted_copy() {
    let store = MemoryStore::new();
    store.put("b", "2").unwrap();
    store.put("a", "1").unwrap();
    store.put("c", "3").unwrap();

    let snapshot = store.snapshot();
    let keys: Vec<_> = snapshot.keys().cloned().collect();
    assert_eq!(keys, vec!["a", "b", "c"]);

    // Later writes do not leak into an earlier snapshot
    store.delete("a").unwrap();
    assert_eq!(snapshot.get("a").map(String::as_str), Some("1"));
}

#[test]
fn test_usable_through_trait_object() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.put("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap(), "v");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_puts_then_gets_distinct_keys() {
    let store = Arc::new(MemoryStore::new());

    let writers: Vec<_> = (0..100)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.put(&format!("key{}", i), &format!("value{}", i)).unwrap();
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let readers: Vec<_> = (0..100)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get(&format!("key{}", i)).unwrap())
        })
        .collect();
    for (i, handle) in readers.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("value{}", i));
    }

    assert_eq!(store.len(), 100);
}

#[test]
fn test_concurrent_readers_with_writer() {
    let store = Arc::new(MemoryStore::new());
    store.put("shared", "0").unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 1..=1000 {
                store.put("shared", &i.to_string()).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut last = 0u32;
                for _ in 0..1000 {
                    // Values only ever move forward and are always whole numbers
                    let seen: u32 = store.get("shared").unwrap().parse().unwrap();
                    assert!(seen >= last);
                    last = seen;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for handle in readers {
        handle.join().unwrap();
    }

    assert_eq!(store.get("shared").unwrap(), "1000");
}
