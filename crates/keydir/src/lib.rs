//! # keydir - The in-memory key directory
//!
//! Maps every live key to the location of its most recent value: segment id,
//! record offset, value length, and timestamp. The directory is rebuilt every
//! time a datastore is opened, from the cheapest source available:
//!
//! 1. the `keydir` snapshot file, when its modification time shows it still
//!    reflects the directory (written by a previous read-only opener),
//! 2. otherwise the segment files themselves: hint files first (one decode
//!    per live key of a merged segment), then full scans of the data files
//!    that have no hint.
//!
//! Hint entries are inserted unconditionally; the live keys of one merge
//! never repeat across its hint files. Data-file records only displace an
//! existing entry when strictly newer (greater timestamp, ties to the
//! greater file id), so enumeration order of the directory never changes the
//! outcome.
//!
//! A read-only opener that had to fall back to scanning re-shares its result
//! as a fresh snapshot, best-effort.

mod snapshot;

pub use snapshot::SNAPSHOT_FILE;

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;

use segment::format::{self, FormatError, KeyDirEntry};
use thiserror::Error;

/// Whether the built directory may be shared on disk for later openers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    /// Writer-owned; never persisted.
    Private,
    /// Reader-owned; persisted as the `keydir` snapshot after a scan build.
    Shared,
}

/// Errors raised while building the directory from disk.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A segment or snapshot record failed to decode.
    #[error(transparent)]
    Corrupt(#[from] FormatError),

    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The key directory itself. Iteration order is unspecified.
#[derive(Debug, Default)]
pub struct KeyDir {
    map: HashMap<Vec<u8>, KeyDirEntry>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory for the datastore at `dir`.
    pub fn build(dir: &Path, privacy: Privacy) -> Result<Self, BuildError> {
        if let Some(keydir) = snapshot::load(dir)? {
            return Ok(keydir);
        }

        let keydir = Self::from_segment_files(dir)?;

        if privacy == Privacy::Shared {
            // Sharing is an optimization for the next opener; a failure here
            // must not fail the open.
            let _ = snapshot::store(dir, &keydir);
        }

        Ok(keydir)
    }

    pub fn get(&self, key: &[u8]) -> Option<&KeyDirEntry> {
        self.map.get(key)
    }

    pub fn insert(&mut self, key: Vec<u8>, entry: KeyDirEntry) {
        self.map.insert(key, entry);
    }

    pub fn keys(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &KeyDirEntry)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn from_segment_files(dir: &Path) -> Result<Self, BuildError> {
        let mut hint_ids = BTreeSet::new();
        let mut data_ids = BTreeSet::new();

        let mut names = Vec::new();
        for dirent in std::fs::read_dir(dir)? {
            let name = dirent?.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }

        for name in &names {
            if let Some(id) = parse_file_id(name, ".hint") {
                hint_ids.insert(id);
            }
        }
        for name in &names {
            if let Some(id) = parse_file_id(name, ".data") {
                // A hint is authoritative for its paired data file.
                if !hint_ids.contains(&id) {
                    data_ids.insert(id);
                }
            }
        }

        let mut keydir = Self::new();
        for id in hint_ids {
            keydir.apply_hint_file(dir, id)?;
        }
        for id in data_ids {
            keydir.apply_data_file(dir, id)?;
        }

        Ok(keydir)
    }

    fn apply_hint_file(&mut self, dir: &Path, file_id: u64) -> Result<(), BuildError> {
        let bytes = std::fs::read(dir.join(format!("{file_id}.hint")))?;

        let mut offset = 0;
        while offset < bytes.len() {
            let (key, mut entry, len) = format::decode_hint_record(&bytes[offset..])?;
            entry.file_id = file_id;
            self.map.insert(key, entry);
            offset += len;
        }

        Ok(())
    }

    fn apply_data_file(&mut self, dir: &Path, file_id: u64) -> Result<(), BuildError> {
        let bytes = std::fs::read(dir.join(format!("{file_id}.data")))?;

        let mut offset = 0;
        while offset < bytes.len() {
            let (record, len) = format::decode_data_record(&bytes[offset..])?;
            let candidate = KeyDirEntry {
                file_id,
                value_pos: offset as u32,
                value_size: record.value.len() as u32,
                timestamp: record.timestamp,
            };

            let newer = match self.map.get(&record.key) {
                Some(existing) => supersedes(&candidate, existing),
                None => true,
            };
            if newer {
                self.map.insert(record.key, candidate);
            }

            offset += len;
        }

        Ok(())
    }
}

/// Whether `candidate` should displace `existing` during a scan build.
fn supersedes(candidate: &KeyDirEntry, existing: &KeyDirEntry) -> bool {
    candidate.timestamp > existing.timestamp
        || (candidate.timestamp == existing.timestamp && candidate.file_id > existing.file_id)
}

/// Extracts the numeric file id from `<id><suffix>`, stripping only the
/// literal suffix. Names that are not `<decimal><suffix>` yield `None`.
fn parse_file_id(name: &str, suffix: &str) -> Option<u64> {
    name.strip_suffix(suffix)?.parse().ok()
}
