//! # Lock Tests

use super::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const SHORT: Duration = Duration::from_millis(50);

#[test]
fn test_lock_path_appends_suffix() {
    let path = DatabaseLock::path_for(std::path::Path::new("/data/forest.db"));
    assert_eq!(path, std::path::PathBuf::from("/data/forest.db.lock"));
}

#[test]
fn test_lock_acquire_creates_file() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("forest.db");

    let lock = DatabaseLock::acquire(&db, SHORT).expect("Should acquire lock");
    assert!(lock.path().exists());
    assert_eq!(lock.pid(), std::process::id());
}

#[test]
fn test_lock_contains_pid() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("forest.db");

    let lock = DatabaseLock::acquire(&db, SHORT).expect("Should acquire lock");
    let content = fs::read_to_string(lock.path()).unwrap();
    let stored_pid: u32 = content.trim().parse().unwrap();
    assert_eq!(stored_pid, std::process::id());
}

#[test]
fn test_double_lock_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("forest.db");

    let _lock1 = DatabaseLock::acquire(&db, SHORT).expect("First lock should succeed");

    let result = DatabaseLock::acquire(&db, SHORT);
    match result {
        Err(LockError::AlreadyLocked { pid, .. }) => assert_eq!(pid, Some(std::process::id())),
        other => panic!("expected AlreadyLocked, got {other:?}"),
    }
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("forest.db");

    {
        let _lock = DatabaseLock::acquire(&db, SHORT).expect("Should acquire");
    }

    let lock2 = DatabaseLock::acquire(&db, SHORT).expect("Should acquire after release");
    drop(lock2);
    assert!(!DatabaseLock::path_for(&db).exists());
}
