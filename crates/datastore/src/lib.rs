//! # datastore - Directory lifecycle and positional reads
//!
//! A datastore is a directory of segment files plus a `.lck` lock file. This
//! crate owns the directory-level concerns:
//!
//! - creating a missing directory (exclusive opens only) and acquiring the
//!   advisory file lock in the requested mode,
//! - resolving `<file_id>.data` paths and reading one record back out of a
//!   segment at a known position,
//! - mapping the tombstone sentinel to "key does not exist".
//!
//! ## Locking
//!
//! The `.lck` file carries an OS advisory lock. A read-write handle takes it
//! exclusively; read-only handles share it. A conflicting holder anywhere on
//! the machine makes [`Datastore::open`] fail with
//! [`StoreError::AccessDenied`] immediately; there is no waiting.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use segment::format::{self, FormatError};
use thiserror::Error;

/// Name of the advisory lock file inside a datastore directory.
pub const LOCK_FILE: &str = ".lck";

/// Sentinel value marking a deleted key. A record whose value equals this
/// byte string is a tombstone; reads resolve it to "key does not exist" and
/// the next merge drops the key entirely.
///
/// The literal is part of the on-disk format and must not change, or existing
/// datastores would resurrect their deleted keys.
pub const TOMBSTONE: &[u8; 64] =
    b"8890fc70294d02dbde257989e802451c2276be7fb177c3ca4399dc4728e4e1e0";

/// How the directory lock is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Single writer: conflicts with every other holder.
    Exclusive,
    /// Readers: any number may coexist.
    Shared,
}

/// Errors surfaced by directory-level operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The directory lock is held in a conflicting mode.
    #[error("access denied: datastore is locked")]
    AccessDenied,

    /// The key is absent or its stored value is the tombstone.
    #[error("{key}: key does not exist")]
    KeyNotExist { key: String },

    /// A record failed CRC validation.
    #[error(transparent)]
    Corrupt(#[from] FormatError),

    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An opened datastore directory holding its advisory lock.
///
/// The lock is released when the `Datastore` is dropped.
#[derive(Debug)]
pub struct Datastore {
    path: PathBuf,
    _lock: File,
}

impl Datastore {
    /// Opens `path` under the requested lock mode.
    ///
    /// A missing directory is created (mode 0777) only for
    /// [`LockMode::Exclusive`]; shared opens surface the original error.
    pub fn open(path: impl AsRef<Path>, mode: LockMode) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        match std::fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound && mode == LockMode::Exclusive => {
                DirBuilder::new().recursive(true).mode(0o777).create(&path)?;
            }
            Err(e) => return Err(e.into()),
        }

        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .mode(0o666)
            .open(path.join(LOCK_FILE))?;

        let acquired = match mode {
            LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(&lock).is_ok(),
            LockMode::Shared => fs2::FileExt::try_lock_shared(&lock).is_ok(),
        };
        if !acquired {
            return Err(StoreError::AccessDenied);
        }

        Ok(Self { path, _lock: lock })
    }

    /// Reads the value of `key` out of segment `file_id` at `value_pos`.
    ///
    /// Reads exactly `header + key + value` bytes, decodes the record, and
    /// validates its CRC. A tombstone value resolves to
    /// [`StoreError::KeyNotExist`].
    pub fn read_value(
        &self,
        file_id: u64,
        key: &[u8],
        value_pos: u32,
        value_size: u32,
    ) -> Result<Vec<u8>, StoreError> {
        let len = format::DATA_HEADER + key.len() + value_size as usize;
        let mut buf = vec![0u8; len];

        let file = File::open(self.segment_path(file_id))?;
        sio::read_full_at(&file, &mut buf, u64::from(value_pos))?;

        let (record, _) = format::decode_data_record(&buf)?;
        if record.value.as_slice() == TOMBSTONE {
            return Err(StoreError::KeyNotExist {
                key: String::from_utf8_lossy(&record.key).into_owned(),
            });
        }

        Ok(record.value)
    }

    /// Path of the data file for `file_id`.
    pub fn segment_path(&self, file_id: u64) -> PathBuf {
        self.path.join(format!("{file_id}.data"))
    }

    /// The datastore directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
