//! The `keydir` snapshot file: a persisted copy of the key directory.
//!
//! Record layout (little-endian):
//!
//! ```text
//! [file_id: u64][key_len: u16][value_len: u32][record_pos: u32][timestamp: u64][key]
//! ```
//!
//! A snapshot is only trusted while its modification time is at least the
//! directory's; any file created or deleted since then bumps the directory
//! mtime and invalidates it.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::SystemTime;

use byteorder::{ByteOrder, LittleEndian};
use segment::format::{FormatError, KeyDirEntry};

use crate::{BuildError, KeyDir};

/// Name of the snapshot file inside a datastore directory.
pub const SNAPSHOT_FILE: &str = "keydir";

/// Fixed header length of a snapshot record.
const SNAPSHOT_HEADER: usize = 26;

/// Loads the snapshot if it exists and is still fresh.
pub(crate) fn load(dir: &Path) -> Result<Option<KeyDir>, BuildError> {
    let path = dir.join(SNAPSHOT_FILE);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if !is_fresh(dir, &path) {
        return Ok(None);
    }

    let mut keydir = KeyDir::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (key, entry, len) = decode_record(&bytes[offset..])?;
        keydir.insert(key, entry);
        offset += len;
    }

    Ok(Some(keydir))
}

/// Writes `keydir` as a fresh snapshot, replacing any previous one.
pub(crate) fn store(dir: &Path, keydir: &KeyDir) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o666)
        .open(dir.join(SNAPSHOT_FILE))?;

    for (key, entry) in keydir.iter() {
        sio::write_full(&mut file, &encode_record(key, entry))?;
    }

    Ok(())
}

/// Whether the snapshot's mtime is not earlier than the directory's.
///
/// Any stat failure counts as stale; the builder then falls back to
/// scanning, which is always correct.
fn is_fresh(dir: &Path, snapshot: &Path) -> bool {
    fn modified(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    match (modified(snapshot), modified(dir)) {
        (Some(snap), Some(dir)) => snap >= dir,
        _ => false,
    }
}

fn encode_record(key: &[u8], entry: &KeyDirEntry) -> Vec<u8> {
    let mut buf = vec![0u8; SNAPSHOT_HEADER + key.len()];

    LittleEndian::write_u64(&mut buf[0..8], entry.file_id);
    LittleEndian::write_u16(&mut buf[8..10], key.len() as u16);
    LittleEndian::write_u32(&mut buf[10..14], entry.value_size);
    LittleEndian::write_u32(&mut buf[14..18], entry.value_pos);
    LittleEndian::write_u64(&mut buf[18..26], entry.timestamp);
    buf[SNAPSHOT_HEADER..].copy_from_slice(key);

    buf
}

fn decode_record(buf: &[u8]) -> Result<(Vec<u8>, KeyDirEntry, usize), FormatError> {
    if buf.len() < SNAPSHOT_HEADER {
        return Err(FormatError::Corrupt);
    }

    let file_id = LittleEndian::read_u64(&buf[0..8]);
    let key_len = LittleEndian::read_u16(&buf[8..10]) as usize;
    let value_size = LittleEndian::read_u32(&buf[10..14]);
    let value_pos = LittleEndian::read_u32(&buf[14..18]);
    let timestamp = LittleEndian::read_u64(&buf[18..26]);

    let total = SNAPSHOT_HEADER + key_len;
    if buf.len() < total {
        return Err(FormatError::Corrupt);
    }

    let key = buf[SNAPSHOT_HEADER..total].to_vec();
    let entry = KeyDirEntry {
        file_id,
        value_pos,
        value_size,
        timestamp,
    };

    Ok((key, entry, total))
}
