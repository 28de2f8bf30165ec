//! Write path: `put()` and `delete()`.
//!
//! Both operations hold the exclusive half of the engine lock across the
//! segment append and the key directory update, so readers either see a
//! write completely or not at all. A delete is an append like any other; the
//! record's value is the tombstone sentinel and the next merge drops the key.

use std::io;

use datastore::TOMBSTONE;
use segment::format::KeyDirEntry;

use crate::{Engine, Error, Result, State};

impl Engine {
    /// Stores `value` under `key`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.require_write("Put")?;

        let mut state = self.state.write();
        append_record(&mut state, key, value)
    }

    /// Deletes `key` by appending a tombstone.
    ///
    /// Returns [`Error::KeyNotFound`] when the key is absent (or already
    /// deleted); the check and the tombstone append happen under one
    /// exclusive-guard acquisition.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.require_write("Delete")?;

        let mut state = self.state.write();
        self.lookup(&state, key)?;
        append_record(&mut state, key, TOMBSTONE)
    }
}

fn append_record(state: &mut State, key: &[u8], value: &[u8]) -> Result<()> {
    // The record header stores the key length as u16 and the value length as
    // u32; anything larger would encode a record that cannot decode.
    if key.len() > u16::MAX as usize {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "key too large (exceeds u16::MAX bytes)",
        )));
    }
    if value.len() > u32::MAX as usize {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "value too large (exceeds u32::MAX bytes)",
        )));
    }

    let timestamp = state.next_timestamp();

    let active = match state.active.as_mut() {
        Some(active) => active,
        // Unreachable behind require_write; kept as a hard failure rather
        // than a panic.
        None => return Err(Error::RequiresWrite { op: "Put" }),
    };

    let (file_id, value_pos) = active.write_data(key, value, timestamp)?;

    state.keydir.insert(
        key.to_vec(),
        KeyDirEntry {
            file_id,
            value_pos,
            value_size: value.len() as u32,
            timestamp,
        },
    );

    Ok(())
}
