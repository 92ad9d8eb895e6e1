//! Checkpointed random-access reader for large single-member gzip
//! line-oriented trace files (typically DFTracer `.pfw.gz` captures).
//!
//! Sequential decompression of a multi-gigabyte trace to reach one byte
//! or line range is prohibitively expensive; this crate builds a
//! persistent on-disk index of periodic deflate checkpoints once
//! ([`Indexer`]), then serves arbitrary byte, line, or JSON-object range
//! reads in time proportional to one checkpoint interval plus the range
//! length ([`Reader`]).
//!
//! ```no_run
//! use dftracer_gzidx::{Indexer, Reader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut indexer = Indexer::new("trace.pfw.gz", None, 1024 * 1024, false)?;
//! indexer.build()?;
//!
//! let mut reader = Reader::new("trace.pfw.gz", None)?;
//! let lines = reader.read_lines(1, 10)?;
//! # Ok(())
//! # }
//! ```
//!
//! Command-line wrappers, log-level configuration, trace generation,
//! Python binding glue, and Dask/dataframe integration are all explicit
//! non-goals of this crate and live, if at all, in a separate binding
//! crate built on top of this one.

mod bitreader;
mod checkpoint;
mod convenience;
mod error;
mod fingerprint;
mod gzip;
mod huffman_tree;
mod index;
mod indexer;
mod inflate;
mod json;
mod output_window;
mod reader;
mod tables;

pub use convenience::{open_reader, open_range_iterator, BoundReader};
pub use error::{Error, Result};
pub use index::CheckpointInfo;
pub use indexer::{IndexerConfig, Indexer, DEFAULT_CHECKPOINT_SIZE};
pub use json::JsonValue;
pub use reader::{RangeChunk, RangeIterator, ReadMode, Reader};
