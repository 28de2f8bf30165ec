//! # engine - The public face of the datastore
//!
//! Ties the [`datastore`], [`keydir`], and [`segment`] crates into a complete
//! append-only key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Caller threads
//!   |
//!   v
//! ┌──────────────────────────────────────────────┐
//! │                  ENGINE                      │
//! │                                              │
//! │ write.rs → active segment append             │
//! │              → keydir update                 │
//! │                                              │
//! │ read.rs  → keydir lookup                     │
//! │              → positional read + CRC check   │
//! │                                              │
//! │ merge.rs → rewrite live entries + hints      │
//! │              → swap keydir, delete old files │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `lib.rs`   | `Engine` struct, open options, sync/close, `Drop`    |
//! | [`read`]   | `get()`, `list_keys()`, `fold()`                     |
//! | [`write`]  | `put()`, `delete()`, timestamp minting               |
//! | [`merge`]  | compaction with hint emission and old-file deletion  |
//! | [`error`]  | the one error enum every operation returns           |
//!
//! ## Concurrency
//!
//! One engine instance may be used from many threads. A readers-writer lock
//! guards the key directory and the active segment writer: reads (including
//! the positional file read, so an append can never interleave mid-lookup)
//! take the shared half, mutations the exclusive half. Across processes the
//! directory's `.lck` advisory lock admits one writer or any number of
//! readers; conflicts fail at open time.
//!
//! ## Durability
//!
//! With [`OpenOption::SyncOnPut`] segment files are opened `O_SYNC` and every
//! append is durable when `put` returns. The default leaves flushing to
//! [`Engine::sync`] and [`Engine::close`].

mod error;
mod merge;
mod read;
mod write;

pub use error::{Error, Result};

use std::path::Path;

use datastore::{Datastore, LockMode};
use keydir::{KeyDir, Privacy};
use parking_lot::RwLock;
use segment::writer::{SegmentKind, SegmentWriter};

/// Options accepted by [`Engine::open`].
///
/// Two categories: access (`ReadOnly`/`ReadWrite`) and durability
/// (`SyncOnPut`/`SyncOnDemand`). The last option given in a category wins;
/// unspecified categories default to `ReadOnly` and `SyncOnDemand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    /// Disallow `put`, `delete`, `merge`, and `sync`. The default.
    ReadOnly,
    /// Enable mutations; creates a missing datastore directory.
    ReadWrite,
    /// Open segment files with synchronous write flags.
    SyncOnPut,
    /// Flush only on an explicit `sync`. The default.
    SyncOnDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy)]
struct Options {
    access: Access,
    sync_on_put: bool,
}

impl Options {
    fn parse(opts: &[OpenOption]) -> Self {
        let mut options = Options {
            access: Access::ReadOnly,
            sync_on_put: false,
        };
        for opt in opts {
            match opt {
                OpenOption::ReadOnly => options.access = Access::ReadOnly,
                OpenOption::ReadWrite => options.access = Access::ReadWrite,
                OpenOption::SyncOnPut => options.sync_on_put = true,
                OpenOption::SyncOnDemand => options.sync_on_put = false,
            }
        }
        options
    }
}

/// Mutable state shared by every operation, behind the engine's lock.
#[derive(Debug)]
struct State {
    keydir: KeyDir,
    /// `Some` only for read-write handles.
    active: Option<SegmentWriter>,
    /// Highest timestamp handed out so far; appends are stamped strictly
    /// monotonically so scans always order rewrites of a key correctly.
    last_timestamp: u64,
}

impl State {
    fn next_timestamp(&mut self) -> u64 {
        let now = segment::now_micros();
        let timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp + 1
        };
        self.last_timestamp = timestamp;
        timestamp
    }
}

/// An opened datastore.
///
/// All operations take `&self`; the engine is `Send + Sync` and intended to
/// be shared across threads. Dropping the engine flushes the active segment
/// best-effort and releases the directory lock.
#[derive(Debug)]
pub struct Engine {
    datastore: Datastore,
    options: Options,
    state: RwLock<State>,
}

impl Engine {
    /// Opens the datastore at `path`.
    ///
    /// Read-write handles take the exclusive directory lock and may create a
    /// missing directory; read-only handles share the lock and re-share the
    /// key directory snapshot for later openers. A conflicting lock holder
    /// yields [`Error::AccessDenied`].
    pub fn open(path: impl AsRef<Path>, opts: &[OpenOption]) -> Result<Engine> {
        let options = Options::parse(opts);

        let (lock_mode, privacy) = match options.access {
            Access::ReadWrite => (LockMode::Exclusive, Privacy::Private),
            Access::ReadOnly => (LockMode::Shared, Privacy::Shared),
        };

        let datastore = Datastore::open(path, lock_mode)?;
        let keydir = KeyDir::build(datastore.path(), privacy)?;

        let active = match options.access {
            Access::ReadWrite => Some(SegmentWriter::new(
                datastore.path(),
                SegmentKind::Active,
                options.sync_on_put,
            )),
            Access::ReadOnly => None,
        };

        tracing::debug!(
            path = %datastore.path().display(),
            keys = keydir.len(),
            read_write = options.access == Access::ReadWrite,
            "datastore opened"
        );

        Ok(Engine {
            datastore,
            options,
            state: RwLock::new(State {
                keydir,
                active,
                last_timestamp: 0,
            }),
        })
    }

    /// Flushes the active segment to disk.
    pub fn sync(&self) -> Result<()> {
        self.require_write("Sync")?;

        let state = self.state.read();
        if let Some(active) = state.active.as_ref() {
            active.sync()?;
        }
        Ok(())
    }

    /// Flushes and closes the active segment and releases the directory lock.
    pub fn close(self) -> Result<()> {
        if self.options.access == Access::ReadWrite {
            let mut state = self.state.write();
            if let Some(active) = state.active.as_mut() {
                active.sync()?;
                active.close();
            }
        }
        Ok(())
    }

    /// Number of live keys currently indexed.
    pub fn len(&self) -> usize {
        self.state.read().keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().keydir.is_empty()
    }

    /// The datastore directory this engine is bound to.
    pub fn path(&self) -> std::path::PathBuf {
        self.datastore.path().to_path_buf()
    }

    fn require_write(&self, op: &'static str) -> Result<()> {
        if self.options.access == Access::ReadOnly {
            return Err(Error::RequiresWrite { op });
        }
        Ok(())
    }
}

/// Best-effort flush on drop, so a handle that merely goes out of scope
/// leaves nothing buffered. Errors cannot propagate from `Drop` and are
/// ignored; `close` reports them.
impl Drop for Engine {
    fn drop(&mut self) {
        if self.options.access == Access::ReadWrite {
            if let Some(state) = self.state.try_read() {
                if let Some(active) = state.active.as_ref() {
                    let _ = active.sync();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
