//! Record codec for data and hint files.
//!
//! Encoding writes into a preallocated buffer at the fixed offsets of the
//! record tables in the crate docs; decoding bounds-checks before every slice
//! so a torn tail or garbage bytes surface as [`FormatError::Corrupt`] rather
//! than a panic.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use thiserror::Error;

/// Fixed header length of a data record (crc + timestamp + key_len + value_len).
pub const DATA_HEADER: usize = 18;

/// Fixed header length of a hint record (timestamp + key_len + value_len + pos).
pub const HINT_HEADER: usize = 18;

/// Errors raised while decoding datastore files.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A record failed CRC validation or was truncated mid-header.
    #[error("corruption detected: datastore files are corrupted")]
    Corrupt,
}

/// A fully decoded data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Microsecond wall clock at which the record was appended.
    pub timestamp: u64,
}

/// Where the most recent value of a key lives.
///
/// This is the in-memory value of the key directory; a hint record is its
/// on-disk projection (minus `file_id`, which a hint file carries in its
/// name instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDirEntry {
    /// Id of the segment holding the record, i.e. the integer part of
    /// `<file_id>.data`.
    pub file_id: u64,
    /// Byte offset of the record start within that segment.
    pub value_pos: u32,
    /// Length of the value payload in bytes.
    pub value_size: u32,
    /// Timestamp of the record.
    pub timestamp: u64,
}

/// Encodes one data record.
///
/// Key length must fit in `u16` and value length in `u32`; both bounds are
/// enforced by the public API above this layer.
pub fn encode_data_record(key: &[u8], value: &[u8], timestamp: u64) -> Vec<u8> {
    let mut buf = vec![0u8; DATA_HEADER + key.len() + value.len()];

    LittleEndian::write_u64(&mut buf[4..12], timestamp);
    LittleEndian::write_u16(&mut buf[12..14], key.len() as u16);
    LittleEndian::write_u32(&mut buf[14..18], value.len() as u32);
    buf[DATA_HEADER..DATA_HEADER + key.len()].copy_from_slice(key);
    buf[DATA_HEADER + key.len()..].copy_from_slice(value);

    let mut hasher = Crc32::new();
    hasher.update(&buf[4..]);
    LittleEndian::write_u32(&mut buf[0..4], hasher.finalize());

    buf
}

/// Decodes the data record starting at `buf[0]`.
///
/// Returns the record and its encoded length, so callers can walk a whole
/// segment by advancing the returned length each step.
pub fn decode_data_record(buf: &[u8]) -> Result<(DataRecord, usize), FormatError> {
    if buf.len() < DATA_HEADER {
        return Err(FormatError::Corrupt);
    }

    let crc = LittleEndian::read_u32(&buf[0..4]);
    let timestamp = LittleEndian::read_u64(&buf[4..12]);
    let key_len = LittleEndian::read_u16(&buf[12..14]) as usize;
    let value_len = LittleEndian::read_u32(&buf[14..18]) as usize;

    let total = DATA_HEADER + key_len + value_len;
    if buf.len() < total {
        return Err(FormatError::Corrupt);
    }

    let mut hasher = Crc32::new();
    hasher.update(&buf[4..total]);
    if hasher.finalize() != crc {
        return Err(FormatError::Corrupt);
    }

    let record = DataRecord {
        key: buf[DATA_HEADER..DATA_HEADER + key_len].to_vec(),
        value: buf[DATA_HEADER + key_len..total].to_vec(),
        timestamp,
    };

    Ok((record, total))
}

/// Encodes one hint record for `key` at the location `entry` describes.
pub fn encode_hint_record(key: &[u8], entry: &KeyDirEntry) -> Vec<u8> {
    let mut buf = vec![0u8; HINT_HEADER + key.len()];

    LittleEndian::write_u64(&mut buf[0..8], entry.timestamp);
    LittleEndian::write_u16(&mut buf[8..10], key.len() as u16);
    LittleEndian::write_u32(&mut buf[10..14], entry.value_size);
    LittleEndian::write_u32(&mut buf[14..18], entry.value_pos);
    buf[HINT_HEADER..].copy_from_slice(key);

    buf
}

/// Decodes the hint record starting at `buf[0]`.
///
/// `file_id` is not part of the record; the returned entry carries `0` there
/// and the caller fills it in from the hint file's name. Returns the key, the
/// entry, and the encoded length.
pub fn decode_hint_record(buf: &[u8]) -> Result<(Vec<u8>, KeyDirEntry, usize), FormatError> {
    if buf.len() < HINT_HEADER {
        return Err(FormatError::Corrupt);
    }

    let timestamp = LittleEndian::read_u64(&buf[0..8]);
    let key_len = LittleEndian::read_u16(&buf[8..10]) as usize;
    let value_size = LittleEndian::read_u32(&buf[10..14]);
    let value_pos = LittleEndian::read_u32(&buf[14..18]);

    let total = HINT_HEADER + key_len;
    if buf.len() < total {
        return Err(FormatError::Corrupt);
    }

    let key = buf[HINT_HEADER..total].to_vec();
    let entry = KeyDirEntry {
        file_id: 0,
        value_pos,
        value_size,
        timestamp,
    };

    Ok((key, entry, total))
}
