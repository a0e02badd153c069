//! Aligned chunk reader.
//!
//! [`ChunkReader`] is an iterator over `chunk_record_count * line_size` byte
//! blocks of any [`Read`] source. Every chunk except the last is full; the last
//! holds whatever remained. A record never spans two chunks.

use std::io::Read;

use crate::error::{ConfigError, ParseError, ParseResult};

/// One block of whole records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based chunk number.
    pub index: usize,
    /// Index of the first record of this chunk in the whole input.
    pub first_record: usize,
    /// Raw record bytes, a whole number of lines.
    pub data: Vec<u8>,
}

/// Error for an input of `length` bytes that does not end on a record boundary.
pub(crate) fn trailing_error(length: usize, line_size: usize) -> ParseError {
    if length < line_size {
        ParseError::ShortInput { actual: length, line_size }
    } else {
        ParseError::UnalignedInput { length, line_size }
    }
}

/// Iterator over aligned chunks of a byte source.
///
/// A single `read` call may return fewer bytes than asked for; the reader keeps
/// reading until the chunk is full or the source is exhausted, so chunk
/// boundaries always fall on record boundaries.
///
/// A trailing partial record ends iteration with
/// [`ParseError::UnalignedInput`] (or [`ParseError::ShortInput`] when the
/// whole source is shorter than one record).
#[derive(Debug)]
pub struct ChunkReader<R> {
    inner: R,
    line_size: usize,
    chunk_size: usize,
    /// Number of chunks yielded so far.
    chunks_read: usize,
    /// Total bytes read from the source.
    bytes_read: usize,
    /// Set on EOF, short final chunk or error.
    finished: bool,
}

/// `line_size * chunk_record_count`, rejecting zero sizes and overflow.
pub(crate) fn chunk_byte_size(
    line_size: usize,
    chunk_record_count: usize,
) -> Result<usize, ConfigError> {
    if line_size == 0 {
        return Err(ConfigError::ZeroLineSize);
    }
    if chunk_record_count == 0 {
        return Err(ConfigError::ZeroChunkSize);
    }
    line_size
        .checked_mul(chunk_record_count)
        .ok_or(ConfigError::ChunkTooLarge { line_size, chunk_record_count })
}

impl<R: Read> ChunkReader<R> {
    /// Creates a reader yielding `chunk_record_count` records per chunk.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroLineSize`], [`ConfigError::ZeroChunkSize`] or
    /// [`ConfigError::ChunkTooLarge`] when the chunk byte size overflows `usize`.
    pub fn new(reader: R, line_size: usize, chunk_record_count: usize) -> Result<Self, ConfigError> {
        let chunk_size = chunk_byte_size(line_size, chunk_record_count)?;
        Ok(Self {
            inner: reader,
            line_size,
            chunk_size,
            chunks_read: 0,
            bytes_read: 0,
            finished: false,
        })
    }

    /// Bytes per full chunk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads up to one chunk, stopping early only at EOF.
    ///
    /// The buffer grows with the data actually read, so a large chunk size
    /// costs nothing on a small input. `read_to_end` retries `Interrupted`.
    fn fill(&mut self) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let limit = u64::try_from(self.chunk_size).unwrap_or(u64::MAX);
        (&mut self.inner).take(limit).read_to_end(&mut data)?;
        Ok(data)
    }

    fn read_chunk(&mut self) -> ParseResult<Option<Chunk>> {
        let data = self.fill()?;
        let filled = data.len();
        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }
        if filled < self.chunk_size {
            self.finished = true;
        }

        let first_record = self.bytes_read / self.line_size;
        self.bytes_read += filled;

        if filled % self.line_size != 0 {
            self.finished = true;
            return Err(trailing_error(self.bytes_read, self.line_size));
        }

        let index = self.chunks_read;
        self.chunks_read += 1;
        Ok(Some(Chunk { index, first_record, data }))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = ParseResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
