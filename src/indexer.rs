//! Indexer: drives the deflate decoder adapter over the whole gzip
//! stream once, emitting checkpoints at configurable uncompressed byte
//! intervals, and persists the result through the index store.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::gzip::skip_gzip_header;
use crate::index::{self, CheckpointInfo, Header, Index, Record};
use crate::inflate::DeflateStream;
use crate::output_window::WINDOW_SIZE;

/// Drives the build pass and exposes read-only accessors
/// (`max_bytes`, `num_lines`, `checkpoints`, ...) once an index is
/// available, whether freshly built or loaded from disk.
pub struct Indexer {
    gz_path: PathBuf,
    idx_path: PathBuf,
    checkpoint_size: u64,
    force_rebuild: bool,
    index: Option<Index>,
}

impl Indexer {
    pub fn new(
        gz_path: impl Into<PathBuf>,
        idx_path: Option<PathBuf>,
        checkpoint_size: u64,
        force_rebuild: bool,
    ) -> Result<Self> {
        if checkpoint_size == 0 {
            return Err(Error::Invalid("checkpoint_size must be > 0".into()));
        }
        let gz_path = gz_path.into();
        let idx_path = idx_path.unwrap_or_else(|| index::default_idx_path(&gz_path));
        Ok(Self {
            gz_path,
            idx_path,
            checkpoint_size,
            force_rebuild,
            index: None,
        })
    }

    /// True if the on-disk index is missing, its fingerprint no longer
    /// matches the source file, its version doesn't match, or
    /// `force_rebuild` was requested.
    pub fn needs_rebuild(&self) -> Result<bool> {
        if self.force_rebuild {
            return Ok(true);
        }
        if !self.idx_path.exists() {
            return Ok(true);
        }
        let loaded = match Index::load(&self.idx_path) {
            Ok(idx) => idx,
            Err(_) => return Ok(true),
        };
        let fp = Fingerprint::of_path(&self.gz_path)?;
        let stale = loaded.is_stale_for(&fp);
        if stale {
            warn!(idx_path = %self.idx_path.display(), "index fingerprint no longer matches source; rebuild needed");
        }
        Ok(stale)
    }

    /// Idempotent: builds a fresh index (if needed) and loads it into
    /// memory, ready for the accessor methods below.
    pub fn build(&mut self) -> Result<()> {
        if !self.needs_rebuild()? {
            self.index = Some(Index::load(&self.idx_path)?);
            return Ok(());
        }

        info!(gz_path = %self.gz_path.display(), "building gzip access index");
        let fp = Fingerprint::of_path(&self.gz_path)?;
        let file = File::open(&self.gz_path)?;
        let mut reader = BufReader::new(file);
        let payload_start = skip_gzip_header(&mut reader)?;
        let mut stream = DeflateStream::open_sequential(reader);

        let mut records: Vec<Record> = Vec::new();
        let mut uc_written: u64 = 0;
        let mut lines_seen: u64 = 0;
        let mut last_checkpoint_uc: u64 = 0;

        // Bytes emitted since the most recent `\n` (0 exactly when the
        // next byte to be written begins a fresh line). Unlike a forward
        // scan for the *next* line boundary, this is known the instant a
        // checkpoint is taken, from data already decoded, so a checkpoint
        // can tell at construction time whether its own `uc_offset` sits
        // at a line start or partway through one.
        let mut since_newline: u64 = 0;

        // always emit the implicit first checkpoint: uc_offset 0 at the
        // start of the deflate payload, with an empty history window.
        records.push(Record {
            uc_offset: 0,
            uc_size: 0,
            c_offset: payload_start,
            bits: 0,
            num_lines: 0,
            line_offset_in_block: 0,
            dict_compressed: vec![],
            dict_len: 0,
        });

        let mut chunk = Vec::new();
        loop {
            chunk.clear();
            let continued = stream.step_to_next_boundary(&mut chunk)?;
            if !chunk.is_empty() {
                lines_seen += count_newlines(&chunk);
                since_newline = match chunk.iter().rposition(|&b| b == b'\n') {
                    Some(pos) => (chunk.len() - 1 - pos) as u64,
                    None => since_newline + chunk.len() as u64,
                };
            }
            uc_written = stream.total_output_written();

            if stream.at_block_boundary()
                && uc_written - last_checkpoint_uc >= self.checkpoint_size
            {
                let (c_offset, bits) = stream.current_c_offset_and_bits();
                let (head, tail) = stream.checkpoint_window();
                let mut window = Vec::with_capacity(head.len() + tail.len());
                window.extend_from_slice(head);
                window.extend_from_slice(tail);
                debug_assert!(window.len() <= WINDOW_SIZE);

                let cp = Checkpoint {
                    c_offset,
                    bits,
                    uc_offset: uc_written,
                    line_number: lines_seen,
                    window,
                };
                let dict_compressed = cp.compress_window()?;

                if let Some(prev) = records.last_mut() {
                    prev.uc_size = uc_written - prev.uc_offset;
                }
                records.push(Record {
                    uc_offset: uc_written,
                    uc_size: 0,
                    c_offset,
                    bits,
                    num_lines: lines_seen,
                    line_offset_in_block: since_newline,
                    dict_len: dict_compressed.len() as u32,
                    dict_compressed,
                });
                last_checkpoint_uc = uc_written;
                debug!(uc_written, lines_seen, "emitted checkpoint");
            }

            if !continued {
                break;
            }
        }

        if !stream.is_done() {
            warn!("deflate stream ended before final block; treating as truncated");
            return Err(Error::CorruptStream {
                c_offset: payload_start,
                reason: "stream ended without a final block".into(),
            });
        }

        if let Some(last) = records.last_mut() {
            last.uc_size = uc_written - last.uc_offset;
        }

        let header = Header {
            checkpoint_size: self.checkpoint_size,
            uncompressed_size: uc_written,
            total_lines: lines_seen,
            source_size: fp.size,
            source_mtime: fp.mtime,
            source_prefix_hash: fp.prefix_hash,
            checkpoint_count: records.len() as u64,
        };
        let index = Index::from_parts(header, records);
        index.write_atomic(&self.idx_path)?;
        self.index = Some(index);
        info!(
            uc_written,
            lines_seen,
            checkpoints = self.index.as_ref().unwrap().checkpoint_count(),
            "index build complete"
        );
        Ok(())
    }

    fn index(&self) -> &Index {
        self.index
            .as_ref()
            .expect("build() must be called before accessors")
    }

    pub fn max_bytes(&self) -> u64 {
        self.index().max_bytes()
    }

    pub fn num_lines(&self) -> u64 {
        self.index().num_lines()
    }

    pub fn checkpoints(&self) -> Vec<CheckpointInfo> {
        self.index().records().iter().map(CheckpointInfo::from).collect()
    }

    pub fn find_checkpoint(&self, uc_offset: u64) -> Option<usize> {
        self.index().find_checkpoint(uc_offset)
    }

    pub fn find_checkpoints_by_line_range(&self, l0: u64, l1: u64) -> (usize, usize) {
        self.index().find_checkpoints_by_line_range(l0, l1)
    }

    pub(crate) fn gz_path(&self) -> &Path {
        &self.gz_path
    }

    pub(crate) fn idx_path(&self) -> &Path {
        &self.idx_path
    }

    pub(crate) fn into_index(self) -> Index {
        self.index.expect("build() must be called before use")
    }

    pub(crate) fn index_ref(&self) -> &Index {
        self.index()
    }
}

/// Builder for [`Indexer`] construction parameters, so a caller doesn't
/// have to juggle `Indexer::new`'s positional `idx_path`/`force_rebuild`
/// arguments directly. Doesn't represent a config *file* format — there
/// isn't one; paths and `checkpoint_size` are plain constructor
/// arguments.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    idx_path: Option<PathBuf>,
    checkpoint_size: u64,
    force_rebuild: bool,
}

/// A reasonable default interval: dense enough that a worst-case seek
/// only has to decode a few hundred KiB of prefix, sparse enough that
/// the index stays small relative to multi-gigabyte traces.
pub const DEFAULT_CHECKPOINT_SIZE: u64 = 1024 * 1024;

impl IndexerConfig {
    pub fn new() -> Self {
        Self {
            idx_path: None,
            checkpoint_size: DEFAULT_CHECKPOINT_SIZE,
            force_rebuild: false,
        }
    }

    pub fn checkpoint_size(mut self, checkpoint_size: u64) -> Self {
        self.checkpoint_size = checkpoint_size;
        self
    }

    pub fn idx_path(mut self, idx_path: impl Into<PathBuf>) -> Self {
        self.idx_path = Some(idx_path.into());
        self
    }

    pub fn force_rebuild(mut self, force_rebuild: bool) -> Self {
        self.force_rebuild = force_rebuild;
        self
    }

    /// Constructs the [`Indexer`] this config describes. Does not build
    /// the index yet — call [`Indexer::build`] for that.
    pub fn open(self, gz_path: impl Into<PathBuf>) -> Result<Indexer> {
        Indexer::new(gz_path, self.idx_path, self.checkpoint_size, self.force_rebuild)
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn count_newlines(chunk: &[u8]) -> u64 {
    chunk.iter().filter(|&&b| b == b'\n').count() as u64
}
