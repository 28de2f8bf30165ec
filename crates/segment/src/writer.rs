//! Append side of a segment: one open data file, rolled over on size.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use crate::format::{self, KeyDirEntry};
use crate::now_micros;

/// Maximum segment size in bytes. The rollover check runs against the size
/// before an append, so a record larger than this still lands as the sole
/// record of a fresh segment.
pub const MAX_SEGMENT_SIZE: u64 = 10 * 1024;

/// Whether the writer produces a plain active segment or a merge output
/// (data plus paired hint file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Active,
    Merge,
}

/// The currently open data file and, in merge mode, its hint companion.
#[derive(Debug)]
struct OpenSegment {
    id: u64,
    file: File,
    hint: Option<File>,
    position: u64,
}

/// Owns the segment a writer is currently appending to.
///
/// Construction performs no I/O; the first [`write_data`](Self::write_data)
/// mints a file id from the microsecond clock and creates `<id>.data` (and
/// `<id>.hint` in merge mode). When an append would push the current segment
/// past [`MAX_SEGMENT_SIZE`], the open files are closed and a fresh pair is
/// created first.
#[derive(Debug)]
pub struct SegmentWriter {
    dir: PathBuf,
    kind: SegmentKind,
    sync_writes: bool,
    open: Option<OpenSegment>,
}

impl SegmentWriter {
    /// Creates a writer over `dir`. With `sync_writes`, segment files are
    /// opened `O_SYNC` so every append is durable when the call returns.
    pub fn new(dir: impl Into<PathBuf>, kind: SegmentKind, sync_writes: bool) -> Self {
        Self {
            dir: dir.into(),
            kind,
            sync_writes,
            open: None,
        }
    }

    /// Appends one data record and returns `(file_id, offset)` of where it
    /// landed, rolling over to a new segment first if the record would not
    /// fit in the current one.
    pub fn write_data(&mut self, key: &[u8], value: &[u8], timestamp: u64) -> io::Result<(u64, u32)> {
        let record = format::encode_data_record(key, value, timestamp);

        let roll = match &self.open {
            None => true,
            Some(seg) => seg.position + record.len() as u64 > MAX_SEGMENT_SIZE,
        };
        if roll {
            self.open = Some(self.open_segment()?);
        }

        let seg = match self.open.as_mut() {
            Some(seg) => seg,
            None => return Err(io::Error::new(io::ErrorKind::Other, "no open segment")),
        };

        sio::write_full(&mut seg.file, &record)?;
        let offset = seg.position;
        seg.position += record.len() as u64;

        Ok((seg.id, offset as u32))
    }

    /// Appends one hint record to the current segment's hint file.
    ///
    /// Only meaningful in merge mode, after a `write_data` has opened the
    /// segment pair.
    pub fn write_hint(&mut self, key: &[u8], entry: &KeyDirEntry) -> io::Result<()> {
        let hint = self
            .open
            .as_mut()
            .and_then(|seg| seg.hint.as_mut())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no open hint file"))?;

        sio::write_full(hint, &format::encode_hint_record(key, entry))
    }

    /// Id of the segment currently being appended to, if one is open.
    pub fn file_id(&self) -> Option<u64> {
        self.open.as_ref().map(|seg| seg.id)
    }

    /// Flushes the open data file to disk.
    pub fn sync(&self) -> io::Result<()> {
        if let Some(seg) = &self.open {
            seg.file.sync_all()?;
        }
        Ok(())
    }

    /// Closes the open data file and its hint companion, if any.
    pub fn close(&mut self) {
        self.open = None;
    }

    fn open_segment(&self) -> io::Result<OpenSegment> {
        // Dropping the previous OpenSegment (in the caller) closes its files.
        // A fresh segment must sort after the one it supersedes, even when a
        // rollover lands within the same microsecond.
        let mut id = now_micros();
        if let Some(seg) = &self.open {
            if id <= seg.id {
                id = seg.id + 1;
            }
        }
        // Never reuse an id already on disk; appending into an existing
        // segment at position 0 would clobber its records.
        while self.dir.join(format!("{id}.data")).exists() {
            id += 1;
        }

        let mut opts = OpenOptions::new();
        opts.create(true).read(true).write(true).mode(0o666);
        if self.sync_writes {
            opts.custom_flags(libc::O_SYNC);
        }

        let file = opts.open(self.dir.join(format!("{id}.data")))?;
        let hint = match self.kind {
            SegmentKind::Merge => Some(opts.open(self.dir.join(format!("{id}.hint")))?),
            SegmentKind::Active => None,
        };

        tracing::debug!(id, kind = ?self.kind, "opened segment");

        Ok(OpenSegment {
            id,
            file,
            hint,
            position: 0,
        })
    }
}
