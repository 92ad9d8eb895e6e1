//! Range iterator: fixed-step iteration across any of the reader's five
//! output shapes, built once over an owned [`Reader`] and then driven
//! either by repeated [`RangeIterator::next_chunk`] calls or as a plain
//! [`Iterator`].

use crate::error::{Error, Result};
use crate::json::JsonValue;
use crate::reader::Reader;

/// Which of the reader's five read methods a [`RangeIterator`] drives.
/// Mirrors the binding surface's `mode` string one-to-one, spelled as an
/// enum rather than five differently-typed reader structs; its
/// `JsonLineBytes` is the binding's `"json_lines_bytes"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Bytes,
    LineBytes,
    Lines,
    JsonLines,
    JsonLineBytes,
}

/// One chunk yielded by a [`RangeIterator`]; which variant is active
/// matches whichever [`ReadMode`] the iterator was constructed with.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeChunk {
    Bytes(Vec<u8>),
    Lines(Vec<Vec<u8>>),
    Json(Vec<JsonValue>),
}

/// Steps over `[start, end)` (byte modes) or `[start, end]`-as-count
/// (line modes) in fixed-size windows of `step`, calling the matching
/// `Reader` read method for each window. `end` is clamped to the
/// reader's `max_bytes()` or `num_lines()` at construction time;
/// `start`, `end`, `step`, `current` are public so a caller can report
/// progress without tracking it separately.
pub struct RangeIterator {
    reader: Reader,
    mode: ReadMode,
    pub start: u64,
    pub end: u64,
    pub step: u64,
    pub current: u64,
}

impl RangeIterator {
    pub(crate) fn new(
        reader: Reader,
        start: u64,
        end: u64,
        mode: ReadMode,
        step: u64,
    ) -> Result<Self> {
        if step == 0 {
            return Err(Error::Invalid("step must be > 0".into()));
        }
        if start > end {
            return Err(Error::Invalid(format!(
                "start ({start}) must be <= end ({end})"
            )));
        }
        let clamp = match mode {
            ReadMode::Bytes | ReadMode::LineBytes | ReadMode::JsonLineBytes => reader.max_bytes(),
            ReadMode::Lines | ReadMode::JsonLines => reader.num_lines(),
        };
        let end = end.min(clamp);
        Ok(Self {
            reader,
            mode,
            start,
            end,
            step,
            current: start,
        })
    }

    /// Rewinds `current` back to `start` so the same iterator can be
    /// driven again from the beginning.
    pub fn reset(&mut self) {
        self.current = self.start;
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.end
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Releases the iterator, returning the reader it was driving so the
    /// caller can keep using it directly.
    pub fn into_reader(self) -> Reader {
        self.reader
    }

    /// Reads the next `[current, min(current + step, end))` window and
    /// advances `current` past it, or returns `None` once `current` has
    /// reached `end`.
    pub fn next_chunk(&mut self) -> Option<Result<RangeChunk>> {
        if self.current >= self.end {
            return None;
        }
        let lo = self.current;
        let hi = (lo + self.step).min(self.end);
        self.current = hi;
        Some(self.read_range(lo, hi))
    }

    fn read_range(&mut self, lo: u64, hi: u64) -> Result<RangeChunk> {
        match self.mode {
            ReadMode::Bytes => self.reader.read_bytes(lo, hi).map(RangeChunk::Bytes),
            ReadMode::LineBytes => self.reader.read_line_bytes(lo, hi).map(RangeChunk::Lines),
            // Line modes track `current` as a 0-based, half-open line
            // index so it composes with the same clamp/step arithmetic
            // the byte modes use; `read_lines` wants 1-based inclusive
            // bounds, so translate only at this boundary.
            ReadMode::Lines => self.reader.read_lines(lo + 1, hi).map(RangeChunk::Lines),
            ReadMode::JsonLines => self.reader.read_lines_json(lo + 1, hi).map(RangeChunk::Json),
            ReadMode::JsonLineBytes => {
                self.reader.read_line_bytes_json(lo, hi).map(RangeChunk::Json)
            }
        }
    }
}

impl Iterator for RangeIterator {
    type Item = Result<RangeChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }
}
