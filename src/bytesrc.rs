//! # Byte Source
//!
//! Grounded on `original_source/src/lib_ccx/file_buffer.h` and
//! `src/file_functions.c`: a buffered front-end for whatever the input
//! actually is (file, stdin, concatenated files, a live network feed) that
//! keeps the logical byte position monotonic and lets the demultiplexer
//! look back a few bytes (for resynchronisation) without re-reading the
//! underlying handle.
//!
//! Network receive (UDP/TCP) is explicitly out of scope for this crate
//! (see the purpose-and-scope non-goals); only the `ByteSource` trait is
//! defined for it. File-backed and concatenated-file sources are fully
//! implemented since they need no networking.

use crate::error::{CcxError, Result};
use std::io::Read;

/// Minimum number of bytes the implementation must keep available behind
/// the read cursor, so container resynchronisation (e.g. TS sync-byte
/// scanning) can always back up a little.
pub const MIN_LOOKBACK: usize = 8;

/// Size of the backing ring buffer used by [`RingByteSource`].
pub const RING_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// A monotonically increasing logical position in the byte stream:
/// `(bytes_past, filebuffer_pos)` as described in the data model — the
/// first component counts bytes consumed from prior files in
/// binary-concat mode, the second is the position within the current
/// buffer fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamPosition {
    /// Bytes consumed from files prior to the current one (concat mode).
    pub bytes_past: u64,
    /// Position within the current buffer fill.
    pub filebuffer_pos: u64,
}

impl StreamPosition {
    /// Total logical offset from the very start of input.
    pub fn total(&self) -> u64 {
        self.bytes_past + self.filebuffer_pos
    }
}

/// Contract every container demultiplexer reads through.
pub trait ByteSource {
    /// Reads exactly `buf.len()` bytes, or returns `Eof`/`TransientEof`.
    /// A live source may block up to a configured timeout before
    /// returning `TransientEof`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Skips `n` bytes without copying them out.
    fn skip(&mut self, n: u64) -> Result<()>;

    /// Pushes `data` back in front of the read cursor (an "ungetc"-style
    /// operation), so a caller that over-read can return bytes for the
    /// next read. Implementations must support at least `MIN_LOOKBACK`
    /// bytes of this.
    fn return_to_buffer(&mut self, data: &[u8]);

    /// Current logical stream position.
    fn position(&self) -> StreamPosition;
}

/// Lets the pipeline hold one boxed `dyn ByteSource` regardless of the
/// concrete source it was built from, so a single `Box<dyn Demuxer>` can
/// own it without the demuxer's own generic parameter leaking out.
impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        (**self).skip(n)
    }

    fn return_to_buffer(&mut self, data: &[u8]) {
        (**self).return_to_buffer(data)
    }

    fn position(&self) -> StreamPosition {
        (**self).position()
    }
}

/// A `ByteSource` that wraps any blocking `std::io::Read`, backed by a
/// ring buffer so pushed-back bytes and short look-backs don't require
/// re-reading the underlying handle.
pub struct RingByteSource<R: Read> {
    inner: R,
    ring: Vec<u8>,
    /// Bytes currently valid in `ring`, starting at index 0.
    filled: usize,
    /// Read cursor within `ring`.
    cursor: usize,
    position: StreamPosition,
}

impl<R: Read> RingByteSource<R> {
    /// Wraps `inner` with a fresh ring buffer.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            ring: Vec::with_capacity(RING_BUFFER_SIZE.min(64 * 1024)),
            filled: 0,
            cursor: 0,
            position: StreamPosition::default(),
        }
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.ring.drain(0..self.cursor);
            self.filled -= self.cursor;
            self.cursor = 0;
        }
    }

    fn fill_at_least(&mut self, n: usize) -> Result<()> {
        while self.filled - self.cursor < n {
            self.compact();
            let mut chunk = [0u8; 64 * 1024];
            let want = chunk.len().min(RING_BUFFER_SIZE);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(CcxError::Eof),
                Ok(got) => {
                    self.ring.extend_from_slice(&chunk[..got]);
                    self.filled += got;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CcxError::Io(e)),
            }
        }
        Ok(())
    }
}

impl<R: Read> ByteSource for RingByteSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.fill_at_least(buf.len())?;
        buf.copy_from_slice(&self.ring[self.cursor..self.cursor + buf.len()]);
        self.cursor += buf.len();
        self.position.filebuffer_pos += buf.len() as u64;
        Ok(())
    }

    fn skip(&mut self, mut n: u64) -> Result<()> {
        while n > 0 {
            let avail = (self.filled - self.cursor) as u64;
            if avail == 0 {
                self.fill_at_least(1)?;
                continue;
            }
            let take = avail.min(n);
            self.cursor += take as usize;
            self.position.filebuffer_pos += take;
            n -= take;
        }
        Ok(())
    }

    fn return_to_buffer(&mut self, data: &[u8]) {
        assert!(
            self.cursor >= data.len(),
            "return_to_buffer cannot push back more than was read"
        );
        self.cursor -= data.len();
        self.ring[self.cursor..self.cursor + data.len()].copy_from_slice(data);
        self.position.filebuffer_pos -= data.len() as u64;
    }

    fn position(&self) -> StreamPosition {
        self.position
    }
}

/// Concatenates several `Read` sources into one logical, monotonically
/// positioned byte stream ("binary concat" mode): when one source hits
/// EOF, the next configured input is opened automatically.
pub struct ConcatByteSource<R: Read> {
    sources: std::vec::IntoIter<R>,
    current: Option<RingByteSource<R>>,
    bytes_past: u64,
}

impl<R: Read> ConcatByteSource<R> {
    /// Builds a concatenated source from an ordered list of readers.
    pub fn new(sources: Vec<R>) -> Self {
        let mut sources = sources.into_iter();
        let current = sources.next().map(RingByteSource::new);
        Self {
            sources,
            current,
            bytes_past: 0,
        }
    }

    fn advance_source(&mut self) -> bool {
        if let Some(cur) = &self.current {
            self.bytes_past += cur.position().total();
        }
        self.current = self.sources.next().map(RingByteSource::new);
        self.current.is_some()
    }
}

impl<R: Read> ByteSource for ConcatByteSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        loop {
            match &mut self.current {
                None => return Err(CcxError::Eof),
                Some(cur) => match cur.read_exact(buf) {
                    Ok(()) => return Ok(()),
                    Err(CcxError::Eof) => {
                        if !self.advance_source() {
                            return Err(CcxError::Eof);
                        }
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        loop {
            match &mut self.current {
                None => return Err(CcxError::Eof),
                Some(cur) => match cur.skip(remaining) {
                    Ok(()) => return Ok(()),
                    Err(CcxError::Eof) => {
                        if !self.advance_source() {
                            return Err(CcxError::Eof);
                        }
                        remaining = 0;
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    fn return_to_buffer(&mut self, data: &[u8]) {
        if let Some(cur) = &mut self.current {
            cur.return_to_buffer(data);
        }
    }

    fn position(&self) -> StreamPosition {
        let local = self.current.as_ref().map(|c| c.position()).unwrap_or_default();
        StreamPosition {
            bytes_past: self.bytes_past,
            filebuffer_pos: local.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_sequential_bytes() {
        let mut src = RingByteSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));
        let mut buf = [0u8; 3];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(src.position().total(), 3);
    }

    #[test]
    fn return_to_buffer_allows_lookback() {
        let mut src = RingByteSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));
        let mut buf = [0u8; 3];
        src.read_exact(&mut buf).unwrap();
        src.return_to_buffer(&buf[1..3]);
        assert_eq!(src.position().total(), 1);
        let mut buf2 = [0u8; 2];
        src.read_exact(&mut buf2).unwrap();
        assert_eq!(buf2, [2, 3]);
    }

    #[test]
    fn skip_advances_position() {
        let mut src = RingByteSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));
        src.skip(2).unwrap();
        let mut buf = [0u8; 1];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [3]);
    }

    #[test]
    fn eof_at_end() {
        let mut src = RingByteSource::new(Cursor::new(vec![1u8, 2]));
        let mut buf = [0u8; 3];
        assert!(matches!(src.read_exact(&mut buf), Err(CcxError::Eof)));
    }

    #[test]
    fn concat_source_moves_across_files() {
        let a = Cursor::new(vec![1u8, 2, 3]);
        let b = Cursor::new(vec![4u8, 5, 6]);
        let mut src = ConcatByteSource::new(vec![a, b]);
        let mut buf = [0u8; 4];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(src.position().total(), 4);
        let mut buf2 = [0u8; 2];
        src.read_exact(&mut buf2).unwrap();
        assert_eq!(buf2, [5, 6]);
    }

    #[test]
    fn concat_source_eof_after_last_file() {
        let a = Cursor::new(vec![1u8]);
        let mut src = ConcatByteSource::new(vec![a]);
        let mut buf = [0u8; 2];
        assert!(matches!(src.read_exact(&mut buf), Err(CcxError::Eof)));
    }
}
