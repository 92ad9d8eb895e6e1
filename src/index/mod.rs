//! Index store: the on-disk binary format plus the in-memory, read-only
//! view over it that the range locator and reader consult.

mod format;
mod locator;

use std::path::{Path, PathBuf};

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::fingerprint::Fingerprint;

pub(crate) use format::{Header, Record};

/// A public, read-only view of a single checkpoint record, with the
/// compressed history window omitted — callers get the positioning
/// metadata, not the raw dictionary bytes. Returned by
/// [`crate::Indexer::checkpoints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub uc_offset: u64,
    pub uc_size: u64,
    pub c_offset: u64,
    pub bits: u8,
    pub num_lines: u64,
    pub line_offset_in_block: u64,
}

impl From<&Record> for CheckpointInfo {
    fn from(r: &Record) -> Self {
        Self {
            uc_offset: r.uc_offset,
            uc_size: r.uc_size,
            c_offset: r.c_offset,
            bits: r.bits,
            num_lines: r.num_lines,
            line_offset_in_block: r.line_offset_in_block,
        }
    }
}

/// A built, immutable index loaded from disk (or freshly written by the
/// indexer and kept in memory). Freely shareable by reference; building
/// a new one never mutates an existing instance.
#[derive(Debug, Clone)]
pub(crate) struct Index {
    header: Header,
    records: Vec<Record>,
}

impl Index {
    pub fn from_parts(header: Header, records: Vec<Record>) -> Self {
        Self { header, records }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (header, records) = format::read(path)?;
        Ok(Self { header, records })
    }

    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        format::write_atomic(path, &self.header, &self.records)
    }

    pub fn is_stale_for(&self, fp: &Fingerprint) -> bool {
        !self.header.matches_fingerprint(fp)
    }

    pub fn max_bytes(&self) -> u64 {
        self.header.uncompressed_size
    }

    pub fn num_lines(&self) -> u64 {
        self.header.total_lines
    }

    pub fn checkpoint_count(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, idx: usize) -> &Record {
        &self.records[idx]
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Greatest checkpoint with `uc_offset <= target`, or `None` when
    /// `target == 0` — the reader primes from the raw stream start in
    /// that case rather than resuming a checkpoint.
    pub fn find_checkpoint(&self, target: u64) -> Option<usize> {
        locator::find_checkpoint(&self.records, target)
    }

    pub fn find_checkpoints_by_line_range(&self, l0: u64, l1: u64) -> (usize, usize) {
        locator::find_checkpoints_by_line_range(&self.records, l0, l1)
    }

    /// Decompress checkpoint `idx`'s history window into a full
    /// `Checkpoint` the decoder adapter can resume from.
    pub fn materialize_checkpoint(&self, idx: usize) -> Result<Checkpoint> {
        let r = &self.records[idx];
        let original_len = (crate::output_window::WINDOW_SIZE as u64).min(r.uc_offset) as usize;
        let window = Checkpoint::decompress_window(&r.dict_compressed, original_len)?;
        Ok(Checkpoint {
            c_offset: r.c_offset,
            bits: r.bits,
            uc_offset: r.uc_offset,
            line_number: r.num_lines,
            window,
        })
    }
}

pub(crate) fn default_idx_path(gz_path: &Path) -> PathBuf {
    let mut s = gz_path.as_os_str().to_owned();
    s.push(".idx");
    PathBuf::from(s)
}
