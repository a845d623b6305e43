//! Tests for prefix scans
//!
//! These tests verify:
//! - Matching keys come back in ascending byte order
//! - Keys outside the prefix are excluded
//! - Scans crossing several backend batches
//! - Snapshot consistency while writers commit mid-iteration
//! - Single-use (fused) iteration
//! - Closing the store cuts off live scans and frees the file

use bolty::config::Config;
use bolty::{BoltyError, Record, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store(batch_size: usize) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("scan.db"))
        .scan_batch_size(batch_size)
        .build();
    let store = Store::open_with(config).unwrap();
    store.create_bucket("users").unwrap();
    (temp_dir, store)
}

fn keys(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.key_lossy()).collect()
}

fn collect(store: &Store, bucket: &str, prefix: &str) -> Vec<Record> {
    store
        .seek_prefix(bucket, prefix)
        .unwrap()
        .collect::<bolty::Result<Vec<_>>>()
        .unwrap()
}

// =============================================================================
// Ordering / Filtering Tests
// =============================================================================

#[test]
fn test_seek_prefix_matches_in_ascending_order() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "alice", &1u32).unwrap();
    store.set("users", "alan", &2u32).unwrap();
    store.set("users", "bob", &3u32).unwrap();

    let records = collect(&store, "users", "al");

    assert_eq!(keys(&records), vec!["alan", "alice"]);
    assert_eq!(records[0].decode::<u32>(store.config().codec).unwrap(), 2);
    assert_eq!(records[1].decode::<u32>(store.config().codec).unwrap(), 1);
}

#[test]
fn test_seek_prefix_excludes_neighbours() {
    let (_temp, store) = setup_store(1000);
    for key in ["a", "ak", "al", "al\u{0}", "alz", "am", "b"] {
        store.set("users", key, "v").unwrap();
    }

    let records = collect(&store, "users", "al");

    assert_eq!(keys(&records), vec!["al", "al\u{0}", "alz"]);
}

#[test]
fn test_seek_prefix_no_matches() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "bob", "v").unwrap();

    assert!(collect(&store, "users", "zed").is_empty());
}

#[test]
fn test_seek_empty_prefix_returns_whole_bucket() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "b", "v").unwrap();
    store.set("users", "a", "v").unwrap();
    store.set("users", "c", "v").unwrap();

    assert_eq!(keys(&collect(&store, "users", "")), vec!["a", "b", "c"]);
}

#[test]
fn test_seek_prefix_is_bytewise() {
    let (_temp, store) = setup_store(1000);
    store.set_raw("users", [0x01u8, 0xFF], b"x").unwrap();
    store.set_raw("users", [0x01u8, 0x00], b"y").unwrap();
    store.set_raw("users", [0x02u8, 0x00], b"z").unwrap();

    let records: Vec<_> = store
        .seek_prefix("users", [0x01u8])
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].key, vec![0x01, 0x00]);
    assert_eq!(records[1].key, vec![0x01, 0xFF]);
}

#[test]
fn test_seek_missing_bucket_fails_up_front() {
    let (_temp, store) = setup_store(1000);

    let err = store.seek_prefix("ghost", "a").err().unwrap();

    assert!(matches!(err, BoltyError::BucketNotFound(_)));
}

// =============================================================================
// Batching Tests
// =============================================================================

#[test]
fn test_seek_spans_many_batches() {
    let (_temp, store) = setup_store(3);
    store
        .update(|tx| {
            for i in 0..50u32 {
                tx.set("users", format!("user:{:03}", i), &i)?;
            }
            tx.set("users", "zzz", &0u32)
        })
        .unwrap();

    let records = collect(&store, "users", "user:");

    assert_eq!(records.len(), 50);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key_lossy(), format!("user:{:03}", i));
        assert_eq!(record.decode::<u32>(store.config().codec).unwrap(), i as u32);
    }
}

#[test]
fn test_seek_batch_boundary_exact_multiple() {
    let (_temp, store) = setup_store(5);
    for i in 0..10u32 {
        store.set("users", format!("k{}", i), &i).unwrap();
    }

    assert_eq!(collect(&store, "users", "k").len(), 10);
}

// =============================================================================
// Snapshot / Iterator Semantics Tests
// =============================================================================

#[test]
fn test_seek_sees_snapshot_despite_concurrent_writes() {
    let (_temp, store) = setup_store(2);
    for i in 0..6u32 {
        store.set("users", format!("k{}", i), &i).unwrap();
    }

    let mut scan = store.seek_prefix("users", "k").unwrap();
    let first = scan.next().unwrap().unwrap();
    assert_eq!(first.key_lossy(), "k0");

    // Committed after the scan started
    store.set("users", "k9", &9u32).unwrap();
    store.delete("users", "k5").unwrap();
    store.set("users", "k1", &100u32).unwrap();

    let rest: Vec<Record> = scan.map(|r| r.unwrap()).collect();
    assert_eq!(keys(&rest), vec!["k1", "k2", "k3", "k4", "k5"]);
    assert_eq!(rest[0].decode::<u32>(store.config().codec).unwrap(), 1);

    // A new scan sees the new state
    assert_eq!(
        keys(&collect(&store, "users", "k")),
        vec!["k0", "k1", "k2", "k3", "k4", "k9"]
    );
}

#[test]
fn test_seek_is_fused_after_exhaustion() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "alice", "v").unwrap();

    let mut scan = store.seek_prefix("users", "al").unwrap();
    assert_eq!(scan.bucket(), "users");
    assert_eq!(scan.prefix(), b"al");

    assert!(scan.next().is_some());
    assert!(scan.next().is_none());
    assert!(scan.next().is_none());
}

#[test]
fn test_close_cuts_off_live_scan() {
    let (_temp, store) = setup_store(1);
    store.set("users", "a1", "v").unwrap();
    store.set("users", "a2", "v").unwrap();
    store.set("users", "a3", "v").unwrap();

    let mut scan = store.seek_prefix("users", "a").unwrap();
    assert_eq!(scan.next().unwrap().unwrap().key, b"a1");

    store.close().unwrap();
    store.open().unwrap();

    assert!(matches!(scan.next(), Some(Err(BoltyError::Closed))));
    assert!(scan.next().is_none());

    let fresh = store.seek_prefix("users", "a").unwrap();
    assert_eq!(fresh.count(), 3);
}

#[test]
fn test_close_releases_lock_held_by_unstarted_scan() {
    let (temp, store) = setup_store(1000);
    store.set("users", "alice", "v").unwrap();

    let mut scan = store.seek_prefix("users", "al").unwrap();
    store.close().unwrap();

    // Another handle can take the file while the scan is still alive
    let other = Store::open_path(temp.path().join("scan.db")).unwrap();
    assert_eq!(other.get("users", "alice").unwrap(), b"\"v\"");

    assert!(matches!(scan.next(), Some(Err(BoltyError::Closed))));
    assert!(scan.next().is_none());
}

#[test]
fn test_close_discards_buffered_records() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "a1", "v").unwrap();
    store.set("users", "a2", "v").unwrap();

    let mut scan = store.seek_prefix("users", "a").unwrap();
    // The whole range fits one batch, the second record is buffered
    assert!(scan.next().unwrap().is_ok());

    store.close().unwrap();

    assert!(matches!(scan.next(), Some(Err(BoltyError::Closed))));
    assert!(scan.next().is_none());
}

#[test]
fn test_exhausted_scan_ignores_close() {
    let (_temp, store) = setup_store(1000);
    store.set("users", "a1", "v").unwrap();

    let mut scan = store.seek_prefix("users", "a").unwrap();
    assert!(scan.next().unwrap().is_ok());
    assert!(scan.next().is_none());

    store.close().unwrap();
    assert!(scan.next().is_none());
}
