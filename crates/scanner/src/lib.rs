//! # Scanner - incremental record streams
//!
//! Reads back-to-back [`record::Record`]s from any [`std::io::Read`] without
//! loading the whole stream into memory, and exposes each stream to a
//! compaction process as a [`MergeCursor`].
//!
//! ```text
//! ┌──────────────┐   bytes   ┌──────────────┐  tokens  ┌──────────────┐
//! │  io::Read    │ ────────▶ │   Scanner    │ ───────▶ │ MergeCursor  │ ──▶ merge driver
//! │ (file, ...)  │           │ split+refill │          │ key/advance  │
//! └──────────────┘           └──────────────┘          └──────────────┘
//! ```
//!
//! The scanner buffers at most `max_token_size + META_LEN` bytes. A record
//! that does not fit is a fatal [`ScanError::TooLong`]; a stream that ends
//! inside a record is [`ScanError::Truncated`]; a record failing its header
//! or checksum checks is [`ScanError::Malformed`]. There is no
//! skip-and-resync: the first error ends the stream.
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//! use scanner::{MergeCursor, Scanner};
//!
//! let mut bytes = Vec::new();
//! Record::new(b"a".to_vec(), b"1".to_vec()).encode(&mut bytes).unwrap();
//! Record::new(b"b".to_vec(), b"2".to_vec()).encode(&mut bytes).unwrap();
//!
//! let mut cursor = MergeCursor::new(Scanner::new(&bytes[..], 1024));
//! cursor.advance().unwrap();
//! assert_eq!(cursor.key(), Some(&b"a"[..]));
//! cursor.advance().unwrap();
//! assert_eq!(cursor.key(), Some(&b"b"[..]));
//! cursor.advance().unwrap();
//! assert_eq!(cursor.key(), None);
//! ```

use record::RecordError;
use std::io;

use thiserror::Error;

mod cursor;
mod scanner;

pub use config::ScanConfig;
pub use cursor::{CursorState, MergeCursor};
pub use record::{Record, META_LEN};
pub use scanner::{split, Records, Scanner, Split};

/// Fatal errors that end a record stream.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The underlying reader failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record at `offset` failed header or checksum validation.
    #[error("malformed record at offset {offset}: {source}")]
    Malformed {
        offset: u64,
        #[source]
        source: RecordError,
    },

    /// The stream ended partway through the record starting at `offset`.
    #[error("truncated record at offset {offset}: stream ended with {remaining} unframed bytes")]
    Truncated { offset: u64, remaining: usize },

    /// The record at `offset` carries `size` bytes of key+value, more than
    /// the scanner was configured to buffer.
    #[error("record at offset {offset} holds {size} bytes of key+value, exceeds max token size {max}")]
    TooLong { offset: u64, size: usize, max: usize },
}

#[cfg(test)]
mod tests;
