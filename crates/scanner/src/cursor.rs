//! Peekable view of one sorted record stream, for k-way merges.
//!
//! A merge driver holds one [`MergeCursor`] per input stream, calls
//! [`advance`](MergeCursor::advance) once on each to load the first record,
//! then repeatedly compares [`key`](MergeCursor::key)s, re-emits the chosen
//! record with [`write_current`](MergeCursor::write_current) and advances the
//! cursor(s) it consumed. Which record wins on duplicate keys is the
//! driver's decision.

use record::Record;
use std::cmp::Ordering;
use std::io::{self, Read, Write};

use crate::{ScanError, Scanner};

/// Where a cursor is in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Created, `advance` not called yet.
    Unstarted,
    /// Positioned on a record.
    HasRecord,
    /// The stream is finished. Terminal.
    Exhausted,
}

/// A cursor over the records of one [`Scanner`].
///
/// The decoded record is cached at `advance` time so that key comparisons
/// during a merge never touch the scanner.
pub struct MergeCursor<R: Read> {
    scanner: Scanner<R>,
    record: Option<Record>,
    state: CursorState,
}

impl<R: Read> MergeCursor<R> {
    /// Wraps `scanner`. The cursor starts before the first record.
    pub fn new(scanner: Scanner<R>) -> Self {
        Self {
            scanner,
            record: None,
            state: CursorState::Unstarted,
        }
    }

    /// Key of the current record, `None` if unstarted or exhausted.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        self.record.as_ref().map(Record::key)
    }

    /// The current record, `None` if unstarted or exhausted.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Where the cursor is in its stream.
    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// `true` once the stream has ended, cleanly or through an error.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Loads the next record, replacing the current one.
    ///
    /// At a clean end of stream the cursor becomes [`CursorState::Exhausted`]
    /// and later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Propagates any [`ScanError`] from the scanner. The cursor drops its
    /// record and reports [`CursorState::Exhausted`]; it must not be used to
    /// drive a merge afterwards.
    pub fn advance(&mut self) -> Result<(), ScanError> {
        if self.state == CursorState::Exhausted {
            return Ok(());
        }

        match self.scanner.advance() {
            Ok(true) => {
                self.record = self.scanner.record();
                self.state = if self.record.is_some() {
                    CursorState::HasRecord
                } else {
                    CursorState::Exhausted
                };
                Ok(())
            }
            Ok(false) => {
                self.record = None;
                self.state = CursorState::Exhausted;
                Ok(())
            }
            Err(e) => {
                self.record = None;
                self.state = CursorState::Exhausted;
                Err(e)
            }
        }
    }

    /// Encodes the current record into `w`.
    ///
    /// Returns `Ok(false)` without writing anything when there is no
    /// current record.
    pub fn write_current<W: Write>(&self, w: &mut W) -> io::Result<bool> {
        match &self.record {
            Some(rec) => {
                rec.encode(w)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Compares the current keys of two cursors. `None` if either has no
    /// current record.
    pub fn cmp_key<S: Read>(&self, other: &MergeCursor<S>) -> Option<Ordering> {
        Some(self.key()?.cmp(other.key()?))
    }

    /// Consumes the cursor and returns its scanner.
    pub fn into_scanner(self) -> Scanner<R> {
        self.scanner
    }
}
