//! Tests for Command execution
//!
//! These tests verify:
//! - Command type classification
//! - Each command routed through Store::execute
//! - Errors propagate unchanged

use bolty::config::Config;
use bolty::{BoltyError, Command, CommandType, Output, Record, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("cmd.db"))
        .build();
    let store = Store::open_with(config).unwrap();
    (temp_dir, store)
}

fn create(store: &Store, bucket: &str) {
    let output = store
        .execute(Command::CreateBucket {
            bucket: bucket.to_string(),
        })
        .unwrap();
    assert_eq!(output, Output::Done);
}

fn set(store: &Store, bucket: &str, key: &str, value: &[u8]) {
    let output = store
        .execute(Command::Set {
            bucket: bucket.to_string(),
            key: key.as_bytes().to_vec(),
            value: value.to_vec(),
        })
        .unwrap();
    assert_eq!(output, Output::Done);
}

// =============================================================================
// Command Type Tests
// =============================================================================

#[test]
fn test_command_types() {
    let get = Command::Get {
        bucket: "b".to_string(),
        key: b"k".to_vec(),
    };
    let seek = Command::Seek {
        bucket: "b".to_string(),
        prefix: b"k".to_vec(),
    };
    let delete = Command::Delete {
        bucket: "b".to_string(),
        key: b"k".to_vec(),
    };

    assert_eq!(get.command_type(), CommandType::Get);
    assert_eq!(seek.command_type(), CommandType::Seek);
    assert_eq!(Command::Buckets.command_type(), CommandType::Buckets);
    assert!(!get.command_type().is_write());
    assert!(!seek.command_type().is_write());
    assert!(delete.command_type().is_write());
    assert!(CommandType::CreateBucket.is_write());
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_execute_set_get() {
    let (_temp, store) = setup_temp_store();
    create(&store, "users");
    set(&store, "users", "alice", b"\"hi\"");

    let output = store
        .execute(Command::Get {
            bucket: "users".to_string(),
            key: b"alice".to_vec(),
        })
        .unwrap();

    assert_eq!(output, Output::Value(b"\"hi\"".to_vec()));
}

#[test]
fn test_execute_delete() {
    let (_temp, store) = setup_temp_store();
    create(&store, "users");
    set(&store, "users", "alice", b"1");

    let output = store
        .execute(Command::Delete {
            bucket: "users".to_string(),
            key: b"alice".to_vec(),
        })
        .unwrap();

    assert_eq!(output, Output::Done);
    assert!(matches!(
        store.get("users", "alice"),
        Err(BoltyError::KeyNotFound)
    ));
}

#[test]
fn test_execute_seek() {
    let (_temp, store) = setup_temp_store();
    create(&store, "users");
    set(&store, "users", "alice", b"1");
    set(&store, "users", "alan", b"2");
    set(&store, "users", "bob", b"3");

    let output = store
        .execute(Command::Seek {
            bucket: "users".to_string(),
            prefix: b"al".to_vec(),
        })
        .unwrap();

    assert_eq!(
        output,
        Output::Records(vec![
            Record {
                key: b"alan".to_vec(),
                value: b"2".to_vec(),
            },
            Record {
                key: b"alice".to_vec(),
                value: b"1".to_vec(),
            },
        ])
    );
}

#[test]
fn test_execute_buckets_and_delete_bucket() {
    let (_temp, store) = setup_temp_store();
    create(&store, "b");
    create(&store, "a");

    assert_eq!(
        store.execute(Command::Buckets).unwrap(),
        Output::Buckets(vec!["a".to_string(), "b".to_string()])
    );

    store
        .execute(Command::DeleteBucket {
            bucket: "a".to_string(),
        })
        .unwrap();

    assert_eq!(
        store.execute(Command::Buckets).unwrap(),
        Output::Buckets(vec!["b".to_string()])
    );
}

#[test]
fn test_execute_propagates_errors() {
    let (_temp, store) = setup_temp_store();
    create(&store, "users");

    let missing_key = store
        .execute(Command::Get {
            bucket: "users".to_string(),
            key: b"nobody".to_vec(),
        })
        .unwrap_err();
    let duplicate = store
        .execute(Command::CreateBucket {
            bucket: "users".to_string(),
        })
        .unwrap_err();

    assert!(matches!(missing_key, BoltyError::KeyNotFound));
    assert!(matches!(duplicate, BoltyError::BucketExists(_)));
}
