//! Merge: rewrite the live state into fresh segments and reclaim space.
//!
//! Every key directory entry outside the active segment is re-read and
//! re-appended to a merge writer, which emits a hint record next to each data
//! record so the next open can rebuild the index without scanning. Keys that
//! resolve to a tombstone are simply not carried over. Entries already in
//! the active segment are copied unchanged; the active segment is never
//! touched.
//!
//! The superseded files (data and hint alike) are listed before the merge
//! writer creates anything, and physically deleted only after the exclusive
//! guard is released; by then no live index entry references them. A crash
//! mid-merge leaves a partial merge segment behind, but the old index was
//! never swapped, and the next open just treats the orphan as one more
//! data+hint pair of valid records.

use std::fs;

use datastore::StoreError;
use keydir::{KeyDir, SNAPSHOT_FILE};
use segment::format::KeyDirEntry;
use segment::writer::{SegmentKind, SegmentWriter};

use crate::{Engine, Result};

impl Engine {
    /// Compacts the datastore.
    ///
    /// Produces merged segment(s) plus paired hint files covering every live
    /// key outside the active segment, swaps the key directory, and deletes
    /// the superseded files.
    pub fn merge(&self) -> Result<()> {
        self.require_write("Merge")?;

        let mut state = self.state.write();

        let active_id = state.active.as_ref().and_then(|a| a.file_id());
        let stale = self.list_stale_files(active_id)?;

        let mut merge_writer = SegmentWriter::new(
            self.datastore.path(),
            SegmentKind::Merge,
            self.options.sync_on_put,
        );

        let mut rebuilt = KeyDir::new();
        let mut carried = 0usize;
        let mut dropped = 0usize;

        // Rewrites continue the engine's monotonic clock so that no later
        // append can ever tie a merged record's timestamp.
        let mut merge_clock = state.last_timestamp;

        for (key, entry) in state.keydir.iter() {
            if active_id == Some(entry.file_id) {
                rebuilt.insert(key.clone(), *entry);
                continue;
            }

            let value = match self.datastore.read_value(
                entry.file_id,
                key,
                entry.value_pos,
                entry.value_size,
            ) {
                Ok(value) => value,
                Err(StoreError::KeyNotExist { .. }) => {
                    // Tombstoned: the key dies here.
                    dropped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let now = segment::now_micros();
            let timestamp = if now > merge_clock { now } else { merge_clock + 1 };
            merge_clock = timestamp;

            let (file_id, value_pos) = merge_writer.write_data(key, &value, timestamp)?;
            let new_entry = KeyDirEntry {
                file_id,
                value_pos,
                value_size: value.len() as u32,
                timestamp,
            };
            merge_writer.write_hint(key, &new_entry)?;
            rebuilt.insert(key.clone(), new_entry);
            carried += 1;
        }

        merge_writer.sync()?;
        merge_writer.close();

        state.keydir = rebuilt;
        state.last_timestamp = merge_clock;
        drop(state);

        // No live index entry references these anymore.
        for name in &stale {
            fs::remove_file(self.datastore.path().join(name))?;
        }

        tracing::debug!(carried, dropped, deleted = stale.len(), "merge finished");

        Ok(())
    }

    /// Every non-hidden file except the active segment and the key directory
    /// snapshot. Called before the merge writer creates its output, so merge
    /// files are never in the list.
    fn list_stale_files(&self, active_id: Option<u64>) -> Result<Vec<String>> {
        let active_name = active_id.map(|id| format!("{id}.data"));

        let mut stale = Vec::new();
        for dirent in fs::read_dir(self.datastore.path())? {
            let name = dirent?.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name == SNAPSHOT_FILE {
                continue;
            }
            if Some(&name) == active_name.as_ref() {
                continue;
            }
            stale.push(name);
        }

        Ok(stale)
    }
}
