//! The engine's error surface.
//!
//! Lower crates report their own kinds (`FormatError` for corruption,
//! `StoreError` for lock and read failures); everything is flattened into one
//! enum here so callers can match a single type across all operations.

use datastore::StoreError;
use keydir::BuildError;
use std::io;
use thiserror::Error;

/// Everything an engine operation can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// The key is absent, or its stored value is the tombstone.
    #[error("{key}: key does not exist")]
    KeyNotFound { key: String },

    /// A mutating operation was called on a read-only handle.
    #[error("{op}: require write permission")]
    RequiresWrite { op: &'static str },

    /// The datastore directory is locked in a conflicting mode.
    #[error("access denied: datastore is locked")]
    AccessDenied,

    /// A record failed CRC validation.
    #[error("corruption detected: datastore files are corrupted")]
    Corruption,

    /// An underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccessDenied => Error::AccessDenied,
            StoreError::KeyNotExist { key } => Error::KeyNotFound { key },
            StoreError::Corrupt(_) => Error::Corruption,
            StoreError::Io(e) => Error::Io(e),
        }
    }
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Corrupt(_) => Error::Corruption,
            BuildError::Io(e) => Error::Io(e),
        }
    }
}

impl Error {
    pub(crate) fn key_not_found(key: &[u8]) -> Self {
        Error::KeyNotFound {
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }
}
