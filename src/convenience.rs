//! Convenience constructors supplementing the core `Indexer`/`Reader`
//! API: a single entry point that picks one of several output shapes
//! via a mode selector instead of requiring the caller to construct a
//! differently-typed reader per shape. These are additive wrappers over
//! [`Reader`] and [`RangeIterator`]; they do not change the core's
//! semantics.

use std::path::PathBuf;

use crate::error::Result;
use crate::reader::{RangeChunk, RangeIterator, ReadMode};
use crate::Reader;

/// A [`Reader`] paired with the [`ReadMode`] it was opened in, so a
/// caller that picked a mode once can read windows via [`BoundReader::read`]
/// without separately remembering which `Reader` method matches that mode.
/// Coordinates passed to `read` follow whatever convention the
/// underlying method uses for that mode: half-open byte offsets for
/// `Bytes`/`LineBytes`/`JsonLineBytes`, 1-based inclusive line numbers
/// for `Lines`/`JsonLines` — the two conventions are never silently
/// aligned.
pub struct BoundReader {
    reader: Reader,
    mode: ReadMode,
}

impl BoundReader {
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn max_bytes(&self) -> u64 {
        self.reader.max_bytes()
    }

    pub fn num_lines(&self) -> u64 {
        self.reader.num_lines()
    }

    pub fn read(&mut self, lo: u64, hi: u64) -> Result<RangeChunk> {
        match self.mode {
            ReadMode::Bytes => self.reader.read_bytes(lo, hi).map(RangeChunk::Bytes),
            ReadMode::LineBytes => self.reader.read_line_bytes(lo, hi).map(RangeChunk::Lines),
            ReadMode::Lines => self.reader.read_lines(lo, hi).map(RangeChunk::Lines),
            ReadMode::JsonLines => self.reader.read_lines_json(lo, hi).map(RangeChunk::Json),
            ReadMode::JsonLineBytes => {
                self.reader.read_line_bytes_json(lo, hi).map(RangeChunk::Json)
            }
        }
    }

    /// Builds a [`RangeIterator`] over `[start, end)` in this reader's
    /// mode, taking ownership of the underlying reader.
    pub fn into_range_iter(self, start: u64, end: u64, step: u64) -> Result<RangeIterator> {
        self.reader.into_range_iter(start, end, self.mode, step)
    }

    pub fn into_inner(self) -> Reader {
        self.reader
    }
}

/// Mirrors `dft_reader(gzip_path, index_path, mode)`: opens a reader
/// against an already-built index and binds it to one output shape.
/// Fails with `NotFound` if the index hasn't been built yet — build one
/// first with [`crate::Indexer`].
pub fn open_reader(
    gz_path: impl Into<PathBuf>,
    idx_path: Option<PathBuf>,
    mode: ReadMode,
) -> Result<BoundReader> {
    let reader = Reader::new(gz_path, idx_path)?;
    Ok(BoundReader { reader, mode })
}

/// Mirrors `dft_reader_range(gzip_path, index_path, start, end, mode,
/// step)`: opens a reader and immediately wraps it in a [`RangeIterator`]
/// without the caller manually wiring the two together.
pub fn open_range_iterator(
    gz_path: impl Into<PathBuf>,
    idx_path: Option<PathBuf>,
    start: u64,
    end: u64,
    mode: ReadMode,
    step: u64,
) -> Result<RangeIterator> {
    let reader = Reader::new(gz_path, idx_path)?;
    reader.into_range_iter(start, end, mode, step)
}
