//! Tests for the append log
//!
//! These tests verify:
//! - Open/create and resuming the write offset
//! - Append returns stable offsets and grows the file exactly
//! - Positional reads, end-of-log and torn-entry signals
//! - Forward iteration

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use logkv::log::{AppendLog, Entry, Mark};
use logkv::{LogKvError, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.data");
    (temp_dir, path)
}

fn open_log(path: &PathBuf) -> AppendLog {
    AppendLog::open(path, SyncStrategy::EveryWrite).unwrap()
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_empty_file() {
    let (_temp, path) = setup_temp_log();

    let log = open_log(&path);

    assert!(path.exists());
    assert_eq!(log.offset(), 0);
    assert!(log.is_empty());
    assert_eq!(log.path(), path.as_path());
}

#[test]
fn test_open_resumes_at_file_length() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        log.append(&Entry::put(b"b".to_vec(), b"22".to_vec())).unwrap();
    }

    let mut log = open_log(&path);
    assert_eq!(log.offset(), 14 + 15);

    let offset = log.append(&Entry::put(b"c".to_vec(), b"3".to_vec())).unwrap();
    assert_eq!(offset, 29);
    assert_eq!(log.read_at(0).unwrap().value, b"1");
}

#[test]
fn test_create_truncates_existing_file() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }

    let log = AppendLog::create(&path, SyncStrategy::Never).unwrap();

    assert!(log.is_empty());
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_returns_start_offsets() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    let first = Entry::put(b"key1".to_vec(), b"value1".to_vec());
    let second = Entry::delete(b"key1".to_vec());

    assert_eq!(log.append(&first).unwrap(), 0);
    assert_eq!(log.append(&second).unwrap(), first.total_size());
    assert_eq!(log.offset(), first.total_size() + second.total_size());
}

#[test]
fn test_append_grows_file_by_total_size() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    let entry = Entry::put(b"k".to_vec(), vec![7u8; 1000]);
    log.append(&entry).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), entry.total_size());
}

#[test]
fn test_every_n_entries_sync_counter() {
    let (_temp, path) = setup_temp_log();
    let mut log = AppendLog::open(&path, SyncStrategy::EveryNEntries { count: 3 }).unwrap();

    log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    log.append(&Entry::put(b"b".to_vec(), b"2".to_vec())).unwrap();
    assert_eq!(log.unsynced(), 2);

    log.append(&Entry::put(b"c".to_vec(), b"3".to_vec())).unwrap();
    assert_eq!(log.unsynced(), 0);
}

/// `/dev/full` accepts the open but fails every write with ENOSPC
#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_leaves_offset_and_counter() {
    let dev_full = std::path::Path::new("/dev/full");
    if !dev_full.exists() {
        return;
    }
    let mut log = AppendLog::open(dev_full, SyncStrategy::EveryNEntries { count: 2 }).unwrap();
    let start = log.offset();

    let result = log.append(&Entry::put(b"k".to_vec(), b"v".to_vec()));

    assert!(matches!(result, Err(LogKvError::Io(_))));
    assert_eq!(log.offset(), start);
    assert_eq!(log.unsynced(), 0);
}

#[test]
fn test_sync_strategies_all_persist() {
    for strategy in [
        SyncStrategy::Never,
        SyncStrategy::EveryWrite,
        SyncStrategy::EveryNEntries { count: 3 },
    ] {
        let (_temp, path) = setup_temp_log();
        {
            let mut log = AppendLog::open(&path, strategy).unwrap();
            for i in 0..10u8 {
                log.append(&Entry::put(vec![b'k', i], vec![i])).unwrap();
            }
            log.close().unwrap();
        }

        let log = open_log(&path);
        assert_eq!(log.iter().count(), 10, "strategy {:?}", strategy);
    }
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_at_returns_entry() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    let offset = log.append(&Entry::put(b"hello".to_vec(), b"world".to_vec())).unwrap();

    let entry = log.read_at(offset).unwrap();
    assert_eq!(entry.key, b"hello");
    assert_eq!(entry.value, b"world");
    assert_eq!(entry.mark, Mark::Put);
}

#[test]
fn test_read_at_delete_entry() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    let offset = log.append(&Entry::delete(b"k".to_vec())).unwrap();

    let entry = log.read_at(offset).unwrap();
    assert_eq!(entry, Entry::delete(b"k".to_vec()));
}

#[test]
fn test_read_at_empty_value() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    let offset = log.append(&Entry::put(b"k".to_vec(), Vec::new())).unwrap();

    assert!(log.read_at(offset).unwrap().value.is_empty());
}

#[test]
fn test_read_at_end_of_log() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    assert!(matches!(log.read_at(0), Err(LogKvError::EndOfLog { offset: 0 })));

    log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();

    assert!(log.read_at(14).unwrap_err().is_end_of_log());
    assert!(log.read_at(1000).unwrap_err().is_end_of_log());
}

#[test]
fn test_read_at_truncated_body() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    // Header promises 2 + 10 body bytes, only 3 follow
    append_raw(&path, &[0, 0, 0, 2, 0, 0, 0, 10, 0, 0, 0, 0, b'x', b'y', b'z']);

    let log = open_log(&path);

    match log.read_at(14) {
        Err(LogKvError::TornEntry { offset, .. }) => assert_eq!(offset, 14),
        other => panic!("expected torn entry, got {:?}", other),
    }
}

#[test]
fn test_read_at_truncated_header() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    append_raw(&path, &[0, 0, 0]);

    let log = open_log(&path);

    assert!(matches!(log.read_at(14), Err(LogKvError::TornEntry { offset: 14, .. })));
}

#[test]
fn test_read_at_bad_mark_at_end_is_torn() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    // Complete-looking record with an unknown mark and nothing after it
    append_raw(&path, &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 9, b'k', b'v']);

    let log = open_log(&path);

    assert!(matches!(log.read_at(14), Err(LogKvError::TornEntry { offset: 14, .. })));
}

#[test]
fn test_read_at_bad_mark_mid_log_is_corruption() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        log.append(&Entry::put(b"b".to_vec(), b"2".to_vec())).unwrap();
    }
    let mut bytes = fs::read(&path).unwrap();
    bytes[11] = 7; // mark of the first entry
    fs::write(&path, &bytes).unwrap();

    let log = open_log(&path);

    assert!(matches!(log.read_at(0), Err(LogKvError::Corruption { offset: 0, .. })));
    assert_eq!(log.read_at(14).unwrap().key, b"b");
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iter_yields_offsets_in_order() {
    let (_temp, path) = setup_temp_log();
    let mut log = open_log(&path);

    let mut expected = Vec::new();
    for i in 0..5 {
        let entry = Entry::put(format!("key{}", i).into_bytes(), format!("v{}", i).into_bytes());
        let offset = log.append(&entry).unwrap();
        expected.push((offset, entry));
    }

    let scanned: Vec<(u64, Entry)> = log.iter().map(|r| r.unwrap()).collect();
    assert_eq!(scanned, expected);
}

#[test]
fn test_iter_empty_log() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    assert_eq!(log.iter().count(), 0);
}

#[test]
fn test_iter_stops_after_torn_entry() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = open_log(&path);
        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    append_raw(&path, &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 9, b'k', b'v']);

    let log = open_log(&path);
    let mut iter = log.iter();

    assert!(iter.next().unwrap().is_ok());
    assert!(matches!(iter.next(), Some(Err(LogKvError::TornEntry { .. }))));
    assert!(iter.next().is_none());
    assert_eq!(iter.offset(), 14);
}
