//! Buffered tokenizer that turns a byte stream into record-sized tokens.
//!
//! The framing decision lives in [`split`], a pure function of the buffered
//! bytes and an end-of-stream flag. [`Scanner::advance`] drives it from a
//! refill loop: compact consumed bytes, grow the buffer if needed, read more,
//! and retry `split` on the same prefix.

use config::ScanConfig;
use record::{Record, RecordError, META_LEN};
use std::io::{self, Read};
use std::iter::FusedIterator;
use std::ops::Range;
use tracing::{debug, trace, warn};

use crate::ScanError;

/// Outcome of one [`split`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// A complete record occupies the first `n` bytes.
    Token(usize),
    /// More bytes are needed. `frame_len` is the full record length once
    /// the meta header is visible.
    NeedMore { frame_len: Option<usize> },
    /// End of stream with nothing left over.
    End,
    /// End of stream partway through a record.
    Truncated,
}

/// Decides where the next token ends in `data`.
///
/// Never consumes anything on [`Split::NeedMore`], so the caller can retry
/// with the same prefix once more bytes have arrived.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] if the record at the front of `data`
/// fails validation. [`RecordError::InsufficientData`] is never returned.
pub fn split(data: &[u8], at_eof: bool) -> Result<Split, RecordError> {
    if at_eof && data.is_empty() {
        return Ok(Split::End);
    }

    match record::validate(data) {
        Ok(n) => Ok(Split::Token(n)),
        Err(RecordError::InsufficientData { needed, .. }) => {
            if at_eof {
                Ok(Split::Truncated)
            } else {
                let frame_len = (data.len() >= META_LEN).then_some(needed);
                Ok(Split::NeedMore { frame_len })
            }
        }
        Err(e) => Err(e),
    }
}

/// Reads records from `R` one token at a time.
///
/// The scanner owns its buffer but not the stream's lifetime: pass `&mut File`
/// to keep the handle, or recover an owned reader with
/// [`into_inner`](Scanner::into_inner).
///
/// Once [`advance`](Scanner::advance) has returned `Ok(false)` or an error,
/// every further call returns `Ok(false)`.
pub struct Scanner<R: Read> {
    reader: R,
    /// Scan buffer; `buf[start..end]` holds bytes not yet tokenized.
    buf: Vec<u8>,
    start: usize,
    end: usize,
    /// Location of the current token inside `buf`.
    token: Range<usize>,
    /// `max_token_size + META_LEN`.
    limit: usize,
    /// Stream offset of `buf[start]`.
    offset: u64,
    eof: bool,
    done: bool,
}

impl<R: Read> Scanner<R> {
    /// Creates a scanner that accepts records with up to `max_token_size`
    /// bytes of key+value.
    pub fn new(reader: R, max_token_size: usize) -> Self {
        Self::with_config(reader, &ScanConfig::new(max_token_size))
    }

    /// Creates a scanner from a [`ScanConfig`].
    ///
    /// `cfg` is taken as is; [`ScanConfig::validate`] is not applied here. A
    /// zero `initial_buffer_size` starts with an empty buffer that grows on
    /// the first read.
    pub fn with_config(reader: R, cfg: &ScanConfig) -> Self {
        Self {
            reader,
            buf: vec![0u8; cfg.initial_capacity()],
            start: 0,
            end: 0,
            token: 0..0,
            limit: cfg.buffer_limit(),
            offset: 0,
            eof: false,
            done: false,
        }
    }

    /// Moves to the next record.
    ///
    /// Returns `Ok(true)` when a new token is available through
    /// [`token`](Scanner::token) and [`record`](Scanner::record), `Ok(false)`
    /// at a clean end of stream.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Io`] if the reader fails.
    /// - [`ScanError::Malformed`] if a record fails validation.
    /// - [`ScanError::Truncated`] if the stream ends inside a record.
    /// - [`ScanError::TooLong`] if a record exceeds the configured bound.
    pub fn advance(&mut self) -> Result<bool, ScanError> {
        self.token = 0..0;
        if self.done {
            return Ok(false);
        }

        loop {
            match split(&self.buf[self.start..self.end], self.eof) {
                Ok(Split::Token(n)) => {
                    self.token = self.start..self.start + n;
                    self.start += n;
                    self.offset += n as u64;
                    return Ok(true);
                }
                Ok(Split::End) => {
                    debug!(offset = self.offset, "record stream exhausted");
                    self.done = true;
                    return Ok(false);
                }
                Ok(Split::Truncated) => {
                    let err = ScanError::Truncated {
                        offset: self.offset,
                        remaining: self.end - self.start,
                    };
                    return Err(self.fail(err));
                }
                Ok(Split::NeedMore { frame_len }) => {
                    if let Some(len) = frame_len {
                        if len > self.limit {
                            let err = self.too_long(len);
                            return Err(self.fail(err));
                        }
                    }
                    self.fill(frame_len)?;
                }
                Err(source) => {
                    let err = ScanError::Malformed {
                        offset: self.offset,
                        source,
                    };
                    return Err(self.fail(err));
                }
            }
        }
    }

    /// Raw bytes of the current record, empty if there is none.
    #[must_use]
    pub fn token(&self) -> &[u8] {
        &self.buf[self.token.clone()]
    }

    /// Decodes the current token.
    ///
    /// Returns `None` before the first successful `advance` and after the
    /// stream has ended.
    #[must_use]
    pub fn record(&self) -> Option<Record> {
        if self.token.is_empty() {
            return None;
        }
        Record::decode(self.token()).ok().map(|(rec, _)| rec)
    }

    /// Stream offset of the first byte not yet returned as a token.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Largest key+value size this scanner accepts.
    #[must_use]
    pub fn max_token_size(&self) -> usize {
        self.limit - META_LEN
    }

    /// Current size of the scan buffer. Never exceeds
    /// `max_token_size() + META_LEN`.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consumes the scanner and returns the underlying reader.
    ///
    /// Bytes already buffered but not yet returned as tokens are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Turns the scanner into an iterator of decoded records.
    pub fn records(self) -> Records<R> {
        Records { scanner: self }
    }

    /// Makes room for at least one more byte and performs a single read.
    fn fill(&mut self, frame_len: Option<usize>) -> Result<(), ScanError> {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        let wanted = frame_len.unwrap_or(0);
        if self.end == self.buf.len() || wanted > self.buf.len() {
            // a full buffer at the limit always holds a complete token, and
            // `advance` rejects frames above the limit before calling here
            debug_assert!(self.buf.len() < self.limit);
            let new_len = wanted
                .max(self.buf.len().saturating_mul(2))
                .max(META_LEN)
                .min(self.limit);
            trace!(from = self.buf.len(), to = new_len, "growing scan buffer");
            self.buf.resize(new_len, 0);
        }

        loop {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(ScanError::Io(e))),
            }
        }
    }

    fn too_long(&self, frame_len: usize) -> ScanError {
        ScanError::TooLong {
            offset: self.offset,
            size: frame_len.saturating_sub(META_LEN),
            max: self.max_token_size(),
        }
    }

    /// Marks the scanner terminal and passes `err` through.
    fn fail(&mut self, err: ScanError) -> ScanError {
        warn!(offset = self.offset, error = %err, "record scan aborted");
        self.done = true;
        err
    }
}

/// Iterator over the records of a [`Scanner`], created by
/// [`Scanner::records`]. Yields at most one error, then stops.
pub struct Records<R: Read> {
    scanner: Scanner<R>,
}

impl<R: Read> Records<R> {
    /// Consumes the iterator and returns the underlying scanner.
    pub fn into_scanner(self) -> Scanner<R> {
        self.scanner
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scanner.advance() {
            Ok(true) => self.scanner.record().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Read> FusedIterator for Records<R> {}
