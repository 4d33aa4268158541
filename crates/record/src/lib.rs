//! # Record - self-framing key/value records
//!
//! The unit of data exchanged between sorted record streams and the
//! compaction process. Records are written back-to-back with no separators;
//! each one carries a fixed-size meta header that is enough to locate its end.
//!
//! ## Binary Record Format
//!
//! ```text
//! [crc32: u32 LE][key_len: u32 LE][value_len: u32 LE][key ...][value ...]
//! ```
//!
//! The first 12 bytes are the meta header ([`META_LEN`]). The CRC32 covers
//! everything after itself (`key_len` through the end of the value).
//!
//! Decoding is a pure function of its input slice: a prefix that is too
//! short yields [`RecordError::InsufficientData`] and consumes nothing, so a
//! caller can buffer more bytes and retry on the same prefix.
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//!
//! let rec = Record::new(b"hello".to_vec(), b"world".to_vec());
//! let bytes = rec.to_bytes().unwrap();
//! assert_eq!(bytes.len(), rec.size());
//!
//! let (decoded, consumed) = Record::decode(&bytes).unwrap();
//! assert_eq!(decoded, rec);
//! assert_eq!(consumed, bytes.len());
//! ```

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use std::io::{self, Write};

use thiserror::Error;

/// Size of the meta header in bytes: 4 (`crc32`) + 4 (`key_len`) + 4 (`value_len`).
pub const META_LEN: usize = 4 + 4 + 4;

/// Errors produced while decoding a record from a byte slice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The slice holds a prefix of a record but not the whole thing.
    ///
    /// `needed` is the number of bytes required to make progress: the header
    /// length while the header is incomplete, the full frame length after.
    #[error("insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The header is internally inconsistent or the checksum does not match.
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl RecordError {
    /// Returns `true` for the retryable "buffer more and try again" signal.
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, RecordError::InsufficientData { .. })
    }
}

/// Parsed meta header.
struct Header {
    crc: u32,
    key_len: usize,
    value_len: usize,
    frame_len: usize,
}

impl Header {
    fn parse(buf: &[u8]) -> Result<Self, RecordError> {
        if buf.len() < META_LEN {
            return Err(RecordError::InsufficientData {
                needed: META_LEN,
                available: buf.len(),
            });
        }

        let crc = LittleEndian::read_u32(&buf[0..4]);
        let key_len = LittleEndian::read_u32(&buf[4..8]) as usize;
        let value_len = LittleEndian::read_u32(&buf[8..12]) as usize;

        let frame_len = META_LEN
            .checked_add(key_len)
            .and_then(|n| n.checked_add(value_len))
            .ok_or_else(|| {
                RecordError::Malformed(format!(
                    "declared lengths overflow (key_len {}, value_len {})",
                    key_len, value_len
                ))
            })?;

        Ok(Self {
            crc,
            key_len,
            value_len,
            frame_len,
        })
    }
}

/// Returns the total encoded length of the record starting at `buf[0]`,
/// reading only the meta header.
///
/// Only [`META_LEN`] bytes need to be present. The checksum is **not**
/// verified here; use [`validate`] or [`Record::decode`] for that.
pub fn frame_len(buf: &[u8]) -> Result<usize, RecordError> {
    Header::parse(buf).map(|h| h.frame_len)
}

/// Fully checks the record at the front of `buf` (header, lengths and CRC)
/// and returns the number of bytes it occupies, without copying the key or
/// value out.
///
/// # Errors
///
/// - [`RecordError::InsufficientData`] if `buf` is a strict prefix of a record.
/// - [`RecordError::Malformed`] on a bad header or checksum mismatch.
pub fn validate(buf: &[u8]) -> Result<usize, RecordError> {
    let header = Header::parse(buf)?;
    checked_frame(buf, &header)?;
    Ok(header.frame_len)
}

fn checked_frame<'a>(buf: &'a [u8], header: &Header) -> Result<&'a [u8], RecordError> {
    if buf.len() < header.frame_len {
        return Err(RecordError::InsufficientData {
            needed: header.frame_len,
            available: buf.len(),
        });
    }

    let frame = &buf[..header.frame_len];
    let mut hasher = Crc32::new();
    hasher.update(&frame[4..]);
    let actual = hasher.finalize();
    if actual != header.crc {
        return Err(RecordError::Malformed(format!(
            "CRC32 mismatch: expected {:#010x}, got {:#010x}",
            header.crc, actual
        )));
    }
    Ok(frame)
}

fn length_field(len: usize, what: &str) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record {} too large (exceeds u32::MAX bytes)", what),
        )
    })
}

/// An immutable key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Record {
    /// Creates a record from its key and value.
    ///
    /// Length limits are enforced at [`encode`](Record::encode) time, not here.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Decodes the record at the front of `buf`.
    ///
    /// Returns the record and the number of bytes it consumed. Trailing
    /// bytes after the record are ignored. On error nothing is consumed and
    /// the same call can be repeated once more bytes are available.
    ///
    /// # Errors
    ///
    /// - [`RecordError::InsufficientData`] if `buf` does not yet contain the
    ///   meta header plus the declared key and value bytes.
    /// - [`RecordError::Malformed`] if the header is inconsistent or the
    ///   CRC32 does not match.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), RecordError> {
        let header = Header::parse(buf)?;
        let frame = checked_frame(buf, &header)?;

        let key_end = META_LEN + header.key_len;
        let key = frame[META_LEN..key_end].to_vec();
        let value = frame[key_end..key_end + header.value_len].to_vec();

        Ok((Self { key, value }, header.frame_len))
    }

    /// The record's key.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The record's value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consumes the record, returning `(key, value)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.key, self.value)
    }

    /// Total encoded size: `META_LEN + key.len() + value.len()`.
    #[must_use]
    pub fn size(&self) -> usize {
        META_LEN + self.key.len() + self.value.len()
    }

    /// Serializes the record to `w`: meta header, then key, then value.
    ///
    /// Nothing is written if the key or the value does not fit in a `u32`
    /// length field; that returns `io::ErrorKind::InvalidInput`. How large a
    /// record a reader accepts is the reader's own bound, not the codec's.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let key_len = length_field(self.key.len(), "key")?;
        let value_len = length_field(self.value.len(), "value")?;

        let mut header = [0u8; META_LEN];
        LittleEndian::write_u32(&mut header[4..8], key_len);
        LittleEndian::write_u32(&mut header[8..12], value_len);

        let mut hasher = Crc32::new();
        hasher.update(&header[4..]);
        hasher.update(&self.key);
        hasher.update(&self.value);
        LittleEndian::write_u32(&mut header[0..4], hasher.finalize());

        w.write_all(&header)?;
        w.write_all(&self.key)?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// Encodes the record into a freshly allocated buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size());
        self.encode(&mut buf)?;
        Ok(buf)
    }
}
