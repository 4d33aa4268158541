use crate::{MergeCursor, ScanError, Scanner};
use record::Record;
use std::io::{self, Cursor, Read};

pub fn rec(key: &[u8], value: &[u8]) -> Record {
    Record::new(key.to_vec(), value.to_vec())
}

/// Concatenates the encodings of `records`.
pub fn encode_all(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records {
        r.encode(&mut out).unwrap();
    }
    out
}

pub fn scan_all<R: Read>(mut scanner: Scanner<R>) -> Result<Vec<Record>, ScanError> {
    let mut out = Vec::new();
    while scanner.advance()? {
        out.push(scanner.record().unwrap());
    }
    Ok(out)
}

pub fn cursor_over(records: &[Record], max_token_size: usize) -> MergeCursor<Cursor<Vec<u8>>> {
    MergeCursor::new(Scanner::new(Cursor::new(encode_all(records)), max_token_size))
}

/// Hands out at most one byte per `read` call.
pub struct OneByteReader<R> {
    inner: R,
}

impl<R> OneByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for OneByteReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.inner.read(&mut buf[..1])
    }
}

/// Fails every other `read` with `ErrorKind::Interrupted`.
pub struct InterruptingReader<R> {
    inner: R,
    interrupt_next: bool,
}

impl<R> InterruptingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            interrupt_next: true,
        }
    }
}

impl<R: Read> Read for InterruptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.interrupt_next {
            self.interrupt_next = false;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        }
        self.interrupt_next = true;
        self.inner.read(buf)
    }
}

/// Serves `data`, then fails with `ErrorKind::ConnectionReset`.
pub struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl FailingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "stream closed underneath the scanner",
            )),
            n => Ok(n),
        }
    }
}

/// Minimal k-way merge. Emits records in key order into `out`.
///
/// With `dedup == false` every record is emitted, ties going to the lower
/// stream index first. With `dedup == true` only the record from the
/// highest-index stream holding the key is emitted (last writer wins).
pub fn merge<R: Read>(
    cursors: &mut [MergeCursor<R>],
    dedup: bool,
    out: &mut Vec<u8>,
) -> Result<Vec<Vec<u8>>, ScanError> {
    for c in cursors.iter_mut() {
        c.advance()?;
    }

    let mut keys = Vec::new();
    loop {
        let min = match cursors.iter().filter_map(|c| c.key()).min() {
            Some(k) => k.to_vec(),
            None => return Ok(keys),
        };
        let ties: Vec<usize> = cursors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.key() == Some(min.as_slice()))
            .map(|(i, _)| i)
            .collect();

        if dedup {
            let winner = ties[ties.len() - 1];
            cursors[winner].write_current(out)?;
            for i in ties {
                cursors[i].advance()?;
            }
        } else {
            cursors[ties[0]].write_current(out)?;
            cursors[ties[0]].advance()?;
        }
        keys.push(min);
    }
}
