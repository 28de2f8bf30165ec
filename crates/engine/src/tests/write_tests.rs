use super::helpers::{count_files_with_ext, open_ro, open_rw};
use crate::{Engine, Error, OpenOption};
use segment::writer::MAX_SEGMENT_SIZE;
use std::fs;
use tempfile::tempdir;

#[test]
fn put_then_get() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    engine.put(b"name", b"alice").unwrap();
    assert_eq!(engine.get(b"name").unwrap(), b"alice");
}

#[test]
fn overwrite_returns_the_latest_value() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    engine.put(b"k", b"v1").unwrap();
    engine.put(b"k", b"v2").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), b"v2");
}

#[test]
fn overwrite_survives_a_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    let engine = open_rw(&path);
    engine.put(b"k", b"v1").unwrap();
    engine.put(b"k", b"v2").unwrap();
    engine.close().unwrap();

    let engine = open_rw(&path);
    assert_eq!(engine.get(b"k").unwrap(), b"v2");
}

#[test]
fn delete_hides_the_key_across_reopens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    let engine = Engine::open(&path, &[OpenOption::ReadWrite, OpenOption::SyncOnPut]).unwrap();
    engine.put(b"k", b"v").unwrap();
    engine.delete(b"k").unwrap();
    engine.close().unwrap();

    let engine = Engine::open(&path, &[OpenOption::ReadWrite, OpenOption::SyncOnPut]).unwrap();
    let err = engine.get(b"k").unwrap_err();
    assert_eq!(err.to_string(), "k: key does not exist");
}

#[test]
fn delete_of_a_missing_key_is_not_found() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    let err = engine.delete(b"never").unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { .. }));
}

#[test]
fn delete_twice_reports_not_found_the_second_time() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    engine.put(b"k", b"v").unwrap();
    engine.delete(b"k").unwrap();

    let err = engine.delete(b"k").unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { .. }));
}

#[test]
fn put_after_delete_resurrects_the_key() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    engine.put(b"k", b"v1").unwrap();
    engine.delete(b"k").unwrap();
    engine.put(b"k", b"v2").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), b"v2");
}

#[test]
fn read_only_handle_rejects_every_mutation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    open_rw(&path).close().unwrap();

    let reader = open_ro(&path);

    assert_eq!(
        reader.put(b"k", b"v").unwrap_err().to_string(),
        "Put: require write permission"
    );
    assert_eq!(
        reader.delete(b"k").unwrap_err().to_string(),
        "Delete: require write permission"
    );
    assert_eq!(
        reader.sync().unwrap_err().to_string(),
        "Sync: require write permission"
    );
    assert_eq!(
        reader.merge().unwrap_err().to_string(),
        "Merge: require write permission"
    );
}

#[test]
fn sync_flushes_without_error() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    engine.put(b"k", b"v").unwrap();
    engine.sync().unwrap();
}

#[test]
fn puts_roll_over_into_bounded_segments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    let value = vec![b'x'; 100];
    for i in 0..300u32 {
        let key = format!("key{i}");
        engine.put(key.as_bytes(), &value).unwrap();
    }
    engine.close().unwrap();

    assert!(count_files_with_ext(&path, "data") >= 2);
    for entry in fs::read_dir(&path).unwrap() {
        let p = entry.unwrap().path();
        if p.extension().map(|x| x == "data").unwrap_or(false) {
            assert!(fs::metadata(&p).unwrap().len() <= MAX_SEGMENT_SIZE);
        }
    }
}

#[test]
fn an_oversized_key_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = open_rw(&dir.path().join("store"));

    let key = vec![b'k'; u16::MAX as usize + 1];
    let err = engine.put(&key, b"v").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("key too large"));
}

#[test]
fn a_value_larger_than_a_segment_still_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    let big = vec![b'z'; MAX_SEGMENT_SIZE as usize + 512];
    engine.put(b"small", b"v").unwrap();
    engine.put(b"big", &big).unwrap();
    assert_eq!(engine.get(b"big").unwrap(), big);
    engine.close().unwrap();

    let engine = open_rw(&path);
    assert_eq!(engine.get(b"big").unwrap(), big);
    assert_eq!(engine.get(b"small").unwrap(), b"v");
}
