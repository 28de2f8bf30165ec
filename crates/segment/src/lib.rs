//! # segment - Append-only data segments
//!
//! The on-disk unit of a datastore is the *segment*: a file holding a
//! contiguous run of checksummed data records in append order. A segment is
//! append-only from creation until a merge deletes it; nothing is ever
//! rewritten in place.
//!
//! ## Binary Record Formats
//!
//! Data record (one per append, all integers little-endian):
//!
//! ```text
//! [crc32: u32][timestamp_us: u64][key_len: u16][value_len: u32][key][value]
//! ```
//!
//! The CRC covers everything after itself, through the end of the value.
//!
//! Hint record (one per live key, written next to merged segments):
//!
//! ```text
//! [timestamp_us: u64][key_len: u16][value_len: u32][record_pos: u32][key]
//! ```
//!
//! ## Naming
//!
//! A segment is named `<file_id>.data` where `file_id` is the microsecond
//! timestamp at which the file was created. A merged segment carries a
//! `<file_id>.hint` companion listing the position of every record it holds.
//!
//! See [`format`] for the codec and [`writer`] for the append side.

pub mod format;
pub mod writer;

pub use format::{DataRecord, FormatError, KeyDirEntry, DATA_HEADER, HINT_HEADER};
pub use writer::{SegmentKind, SegmentWriter, MAX_SEGMENT_SIZE};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall clock in microseconds since the Unix epoch.
///
/// Segment file ids and record timestamps both come from this clock.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_micros() as u64
}
