use super::helpers::{count_files_with_ext, open_rw};
use tempfile::tempdir;

/// Enough puts to roll the active segment several times.
fn fill(engine: &crate::Engine, count: u32) {
    for i in 1..=count {
        let key = format!("key{i}");
        let value = format!("value{i}");
        engine.put(key.as_bytes(), value.as_bytes()).unwrap();
    }
}

#[test]
fn merge_preserves_every_live_binding() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    fill(&engine, 1000);
    engine.merge().unwrap();

    assert_eq!(engine.get(b"key100").unwrap(), b"value100");
    assert_eq!(engine.get(b"key1000").unwrap(), b"value1000");
    assert_eq!(engine.len(), 1000);
}

#[test]
fn merge_reclaims_superseded_segments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    // Overwrite the same keys repeatedly so most segments hold dead records.
    for round in 0..10u32 {
        for i in 0..50u32 {
            let key = format!("key{i}");
            let mut value = format!("round{round}-{i:04}").into_bytes();
            value.extend_from_slice(&[b'x'; 80]);
            engine.put(key.as_bytes(), &value).unwrap();
        }
    }

    let before = count_files_with_ext(&path, "data");
    assert!(before >= 2);

    engine.merge().unwrap();

    let after = count_files_with_ext(&path, "data");
    assert!(after < before, "expected fewer data files, had {before}, now {after}");

    for i in 0..50u32 {
        let key = format!("key{i}");
        let value = engine.get(key.as_bytes()).unwrap();
        assert!(value.starts_with(format!("round9-{i:04}").as_bytes()));
    }
}

#[test]
fn merge_writes_hint_files_used_on_the_next_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    let engine = open_rw(&path);
    fill(&engine, 1000);
    engine.merge().unwrap();
    assert!(count_files_with_ext(&path, "hint") >= 1);
    engine.close().unwrap();

    let engine = open_rw(&path);
    assert_eq!(engine.get(b"key50").unwrap(), b"value50");
    assert_eq!(engine.get(b"key999").unwrap(), b"value999");
    assert_eq!(engine.len(), 1000);
}

#[test]
fn merge_drops_tombstoned_keys_for_good() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    // Push the deletes out of the active segment before merging.
    fill(&engine, 400);
    engine.delete(b"key7").unwrap();
    engine.delete(b"key8").unwrap();
    for i in 0..400u32 {
        let key = format!("pad{i}");
        engine.put(key.as_bytes(), b"padding-value").unwrap();
    }
    engine.delete(b"key8").unwrap_err(); // still gone

    engine.merge().unwrap();

    assert!(engine.get(b"key7").unwrap_err().to_string().contains("does not exist"));
    assert!(engine.get(b"key9").is_ok());
    engine.close().unwrap();

    let engine = open_rw(&path);
    assert!(engine.get(b"key7").is_err());
    assert_eq!(engine.get(b"key9").unwrap(), b"value9");
}

#[test]
fn merge_leaves_the_active_segment_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    // A handful of small puts stays inside one active segment.
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    let before = count_files_with_ext(&path, "data");
    assert_eq!(before, 1);

    engine.merge().unwrap();

    // Nothing outside the active segment, so nothing to rewrite or delete.
    assert_eq!(count_files_with_ext(&path, "data"), 1);
    assert_eq!(count_files_with_ext(&path, "hint"), 0);
    assert_eq!(engine.get(b"a").unwrap(), b"1");
    assert_eq!(engine.get(b"b").unwrap(), b"2");
}

#[test]
fn writes_keep_working_after_a_merge() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    fill(&engine, 500);
    engine.merge().unwrap();

    engine.put(b"post", b"merge").unwrap();
    assert_eq!(engine.get(b"post").unwrap(), b"merge");
    engine.close().unwrap();

    let engine = open_rw(&path);
    assert_eq!(engine.get(b"post").unwrap(), b"merge");
    assert_eq!(engine.get(b"key123").unwrap(), b"value123");
}

#[test]
fn repeated_merges_are_stable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    let engine = open_rw(&path);

    fill(&engine, 300);
    engine.merge().unwrap();
    engine.merge().unwrap();

    assert_eq!(engine.len(), 300);
    assert_eq!(engine.get(b"key42").unwrap(), b"value42");
}
