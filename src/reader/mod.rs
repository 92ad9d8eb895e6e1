//! Reader cursor: opens the gzip file, primes the bit-stream decoder at
//! the nearest checkpoint, discards the prefix, and yields results
//! framed as raw bytes, complete lines, or parsed JSON values.
//!
//! A cursor owns one file descriptor and is not thread-safe; the index
//! it reads from is immutable and may be shared by reference across as
//! many independently-owned cursors as callers want.

mod framer;
pub mod iter;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::gzip::skip_gzip_header;
use crate::index::{self, Index};
use crate::inflate::DeflateStream;
use crate::json::JsonValue;

pub use iter::{RangeChunk, RangeIterator, ReadMode};

/// One byte-oriented cursor over a checkpointed gzip trace file.
pub struct Reader {
    gz_path: PathBuf,
    index: Arc<Index>,
    file: File,
}

impl Reader {
    /// Open a reader against an already-built index. Fails with
    /// `NotFound` if either the source file or the index is missing, or
    /// with `StaleIndex` if the source file's fingerprint no longer
    /// matches what the index was built against; use
    /// [`crate::Indexer`] to build or rebuild one first.
    pub fn new(gz_path: impl Into<PathBuf>, idx_path: Option<PathBuf>) -> Result<Self> {
        let gz_path = gz_path.into();
        let idx_path = idx_path.unwrap_or_else(|| index::default_idx_path(&gz_path));
        if !idx_path.exists() {
            return Err(Error::NotFound(idx_path));
        }
        let index = Index::load(&idx_path)?;
        if !gz_path.exists() {
            return Err(Error::NotFound(gz_path));
        }
        let fp = Fingerprint::of_path(&gz_path)?;
        if index.is_stale_for(&fp) {
            return Err(Error::StaleIndex {
                path: gz_path,
                reason: "source file changed since the index was built".into(),
            });
        }
        Self::from_index(gz_path, Arc::new(index))
    }

    pub(crate) fn from_index(gz_path: PathBuf, index: Arc<Index>) -> Result<Self> {
        if !gz_path.exists() {
            return Err(Error::NotFound(gz_path));
        }
        let file = File::open(&gz_path)?;
        Ok(Self {
            gz_path,
            index,
            file,
        })
    }

    pub fn max_bytes(&self) -> u64 {
        self.index.max_bytes()
    }

    pub fn num_lines(&self) -> u64 {
        self.index.num_lines()
    }

    /// Discards any cursor-local state; the open file descriptor is
    /// kept. Since this cursor reopens its decoder fresh for every call
    /// there is nothing else to reset, but this keeps the method
    /// meaningful if per-call caching is added later.
    pub fn reset(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn gz_path(&self) -> &Path {
        &self.gz_path
    }

    fn validate_byte_range(&self, start: u64, end: u64) -> Result<()> {
        if start >= end {
            return Err(Error::Invalid(format!(
                "start ({start}) must be < end ({end})"
            )));
        }
        if end > self.max_bytes() {
            return Err(Error::OutOfRange(format!(
                "end ({end}) exceeds uncompressed size ({})",
                self.max_bytes()
            )));
        }
        Ok(())
    }

    /// Decoder primed to emit output starting at the checkpoint
    /// covering `uc_target`, along with that checkpoint's own
    /// `uc_offset` (the caller discards `uc_target - uc_offset` bytes
    /// to land exactly on `uc_target`).
    fn decoder_at<'a>(
        &'a mut self,
        uc_target: u64,
    ) -> Result<(DeflateStream<BufReader<&'a mut File>>, u64)> {
        match self.index.find_checkpoint(uc_target) {
            None => {
                tracing::trace!(uc_target, "repositioning cursor at stream start");
                self.file.seek(SeekFrom::Start(0))?;
                let mut reader = BufReader::new(&mut self.file);
                skip_gzip_header(&mut reader)?;
                Ok((DeflateStream::open_sequential(reader), 0))
            }
            Some(idx) => self.decoder_at_checkpoint(idx),
        }
    }

    fn decoder_at_checkpoint<'a>(
        &'a mut self,
        idx: usize,
    ) -> Result<(DeflateStream<BufReader<&'a mut File>>, u64)> {
        let checkpoint = self.index.materialize_checkpoint(idx)?;
        tracing::trace!(
            checkpoint_uc_offset = checkpoint.uc_offset,
            c_offset = checkpoint.c_offset,
            "repositioning cursor at checkpoint"
        );
        self.file.seek(SeekFrom::Start(checkpoint.c_offset))?;
        let reader = BufReader::new(&mut self.file);
        let stream = DeflateStream::resume_at(
            reader,
            checkpoint.c_offset,
            checkpoint.bits,
            &checkpoint.window,
            checkpoint.uc_offset,
        )?;
        Ok((stream, checkpoint.uc_offset))
    }

    /// `read_bytes(start, end)`: exactly `end - start` uncompressed
    /// bytes.
    pub fn read_bytes(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.validate_byte_range(start, end)?;
        let (mut stream, checkpoint_uc) = self.decoder_at(start)?;
        let skip = (start - checkpoint_uc) as usize;
        let want = skip + (end - start) as usize;
        let mut buf = Vec::with_capacity(want);
        stream.fill(&mut buf, want)?;
        if buf.len() != want {
            return Err(Error::CorruptStream {
                c_offset: 0,
                reason: "stream ended before the requested range".into(),
            });
        }
        Ok(buf.split_off(skip))
    }

    /// `read_line_bytes(start, end)`: complete `\n`-terminated lines
    /// owned by `[start, end)` under the straddling-line rule
    /// documented on [`framer::frame_line_bytes`].
    pub fn read_line_bytes(&mut self, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
        self.validate_byte_range(start, end)?;
        let (mut stream, checkpoint_uc) = self.decoder_at(start)?;
        let want = (end - checkpoint_uc) as usize;
        let mut buf = Vec::with_capacity(want);
        stream.fill(&mut buf, want)?;
        framer::frame_line_bytes(&mut stream, &buf, checkpoint_uc, start, end)
    }

    /// `read_lines(first, last)`: 1-based inclusive line numbers.
    pub fn read_lines(&mut self, first: u64, last: u64) -> Result<Vec<Vec<u8>>> {
        let total = self.num_lines();
        if first < 1 || last > total || first > last {
            return Err(Error::OutOfRange(format!(
                "line range [{first}, {last}] invalid for a {total}-line file"
            )));
        }
        let zero_based_first = first - 1;
        let (mut lo, _hi) = self
            .index
            .find_checkpoints_by_line_range(zero_based_first, zero_based_first);
        // `num_lines` counts completed lines strictly before a checkpoint's
        // `uc_offset`, so a checkpoint can have `num_lines == zero_based_first`
        // while still sitting partway through that very line. Step back
        // until we land on a checkpoint that starts at or before the
        // requested line's own start.
        while lo > 0
            && self.index.record(lo).num_lines == zero_based_first
            && self.index.record(lo).line_offset_in_block > 0
        {
            lo -= 1;
        }
        let checkpoint_lines = self.index.record(lo).num_lines;
        let (mut stream, _) = self.decoder_at_checkpoint(lo)?;
        framer::frame_lines_by_number(
            &mut stream,
            checkpoint_lines,
            zero_based_first,
            (last - first + 1) as usize,
        )
    }

    pub fn read_lines_json(&mut self, first: u64, last: u64) -> Result<Vec<JsonValue>> {
        Ok(self
            .read_lines(first, last)?
            .into_iter()
            .map(|line| JsonValue::parse_line(&line))
            .collect())
    }

    pub fn read_line_bytes_json(&mut self, start: u64, end: u64) -> Result<Vec<JsonValue>> {
        Ok(self
            .read_line_bytes(start, end)?
            .into_iter()
            .map(|line| JsonValue::parse_line(&line))
            .collect())
    }

    /// Builds a [`RangeIterator`] that steps `[start, end)` in
    /// `step`-sized windows, taking ownership of this reader. Recover it
    /// afterwards with [`RangeIterator::into_reader`].
    pub fn into_range_iter(
        self,
        start: u64,
        end: u64,
        mode: ReadMode,
        step: u64,
    ) -> Result<RangeIterator> {
        RangeIterator::new(self, start, end, mode, step)
    }
}
