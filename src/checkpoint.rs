//! A single resume point into the gzip stream: the compressed/uncompressed
//! offset pair, the leftover sub-byte bit count, and the 32 KiB (or
//! shorter, near the start of the file) history window needed to seed
//! the decoder's back-reference buffer.
//!
//! The window is stored compressed on disk to keep the index small. We
//! reach for `flate2` here rather than our own hand-rolled deflate: this
//! is ordinary, non-resumable compress/decompress of an opaque blob, the
//! kind of thing a library primitive is exactly right for, unlike the
//! resumable gzip-member decode in [`crate::inflate`] which no published
//! crate exposes.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// One checkpoint: a resumable position at a deflate block boundary.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Compressed (gzip member payload) byte offset of the first
    /// not-fully-consumed byte.
    pub c_offset: u64,
    /// How many low bits of the byte at `c_offset` were already consumed
    /// by the previous block. Always `< 8`.
    pub bits: u8,
    /// Uncompressed byte offset this checkpoint resumes decoding at.
    pub uc_offset: u64,
    /// Line number (0-based count of `\n` seen so far) at `uc_offset`.
    pub line_number: u64,
    /// Up to 32 KiB of decoder history immediately preceding
    /// `uc_offset`, needed to satisfy back-references in the next block.
    pub window: Vec<u8>,
}

impl Checkpoint {
    pub(crate) fn compress_window(&self) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.window)?;
        Ok(encoder.finish()?)
    }

    pub(crate) fn decompress_window(compressed: &[u8], original_len: usize) -> Result<Vec<u8>> {
        // The implicit checkpoint at uc_offset 0 has no history at all, so
        // its dictionary was never run through the encoder; a zlib stream
        // has no representation for "zero bytes, no header either", so
        // avoid feeding the decoder an empty stream it can't parse.
        if original_len == 0 {
            return Ok(Vec::new());
        }
        let mut decoder = ZlibDecoder::new(compressed);
        let mut out = Vec::with_capacity(original_len);
        decoder.read_to_end(&mut out).map_err(|e| Error::CorruptIndex(format!(
            "checkpoint dictionary failed to decompress: {e}"
        )))?;
        if out.len() != original_len {
            return Err(Error::CorruptIndex(format!(
                "checkpoint dictionary length mismatch: expected {original_len}, got {}",
                out.len()
            )));
        }
        Ok(out)
    }
}
