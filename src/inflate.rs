//! The bit-stream decoder adapter: a from-scratch raw DEFLATE (RFC 1951)
//! decoder that can be resumed mid-stream from a checkpoint
//! instead of only ever running from byte 0. No published Rust codec
//! crate exposes a resume-from-arbitrary-checkpoint API, so this is
//! hand-rolled, following the table/tree decode shape of a from-scratch
//! checkpoint-capable inflater: a flat state machine over a small set of
//! states, a canonical-Huffman lookup table for symbol decode, and a
//! circular output window doubling as both pending-output buffer and
//! history for length/distance back-references.

use std::io::Read;

use crate::bitreader::{InputBuffer, SavedBits};
use crate::huffman_tree::HuffmanTree;
use crate::output_window::{OutputWindow, WINDOW_SIZE};
use crate::tables::{CODE_LENGTH_ORDER, DIST_BASE_EXTRA, LENGTH_BASE_EXTRA};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeError {
    InvalidHuffmanData,
    BadBlockType,
    BadStoredBlockLength,
    InvalidRepeatCode,
    DistanceTooFar,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            DecodeError::InvalidHuffmanData => "invalid huffman data",
            DecodeError::BadBlockType => "invalid deflate block type",
            DecodeError::BadStoredBlockLength => "stored block LEN/NLEN mismatch",
            DecodeError::InvalidRepeatCode => "repeat code with nothing to repeat",
            DecodeError::DistanceTooFar => "back-reference distance exceeds history",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    Uncompressed,
    Static,
    Dynamic,
}

impl BlockType {
    fn from_bits(v: u32) -> Option<Self> {
        match v {
            0 => Some(BlockType::Uncompressed),
            1 => Some(BlockType::Static),
            2 => Some(BlockType::Dynamic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InflaterState {
    /// Between blocks: no partial symbol is pending, so this is the only
    /// state a checkpoint can be taken in (besides `Done`).
    ReadingBFinal,
    ReadingBType,
    ReadingNumLitCodes,
    ReadingNumDistCodes,
    ReadingNumCodeLengthCodes,
    ReadingCodeLengthCodeLengths,
    ReadingTreeCodes,
    DecodeTop,
    HaveInitialLength,
    HaveFullLength,
    HaveDistCode,
    UncompressedAligning,
    UncompressedHeader,
    DecodingUncompressed,
    Done,
}

pub(crate) enum StepResult {
    Continue,
    /// Just finished a block and is sitting at `ReadingBFinal`, eligible
    /// for a checkpoint. Distinct from `Done` so a caller driving many
    /// blocks in a row (the indexer) gets a chance to inspect state
    /// between every block without the state machine racing ahead into
    /// the next one first.
    BlockBoundary,
    NeedInput,
    NeedOutputSpace,
    Done,
}

/// The raw-deflate decoder. Holds the full state needed to pause at any
/// point and resume later given the same (or a reconstructed) input
/// stream starting at the right bit position, as long as resumption
/// happens at a block boundary (`at_block_boundary()`).
pub(crate) struct Inflater {
    state: InflaterState,
    bfinal: bool,
    block_type: BlockType,
    output: OutputWindow,

    literal_length_tree: HuffmanTree,
    distance_tree: HuffmanTree,
    code_length_tree: HuffmanTree,

    // dynamic header parsing
    hlit: usize,
    hdist: usize,
    hclen: usize,
    code_length_code_lengths: [u8; 19],
    code_length_read_index: usize,
    code_lengths: Vec<u8>,
    code_length_repeat_symbol: Option<u16>,

    // pending length/distance decode
    pending_length_code: u16,
    pending_length: usize,
    pending_distance_code: u16,

    // stored (uncompressed) block header assembly
    uncompressed_header: [u8; 4],
    uncompressed_header_index: usize,
    block_length: usize,

    /// total uncompressed bytes ever produced (drained + still buffered),
    /// used both for checkpoint dictionary sizing and for bounding
    /// back-reference distances.
    total_output_written: u64,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            state: InflaterState::ReadingBFinal,
            bfinal: false,
            block_type: BlockType::Uncompressed,
            output: OutputWindow::new(),
            literal_length_tree: HuffmanTree::invalid(),
            distance_tree: HuffmanTree::invalid(),
            code_length_tree: HuffmanTree::invalid(),
            hlit: 0,
            hdist: 0,
            hclen: 0,
            code_length_code_lengths: [0; 19],
            code_length_read_index: 0,
            code_lengths: Vec::with_capacity(320),
            code_length_repeat_symbol: None,
            pending_length_code: 0,
            pending_length: 0,
            pending_distance_code: 0,
            uncompressed_header: [0; 4],
            uncompressed_header_index: 0,
            block_length: 0,
            total_output_written: 0,
        }
    }

    /// Re-prime the decoder to resume at a checkpoint: the caller
    /// supplies the 32 KiB (or shorter, near the start of the file)
    /// history window and the uncompressed offset it corresponds to.
    /// The bit position itself is handled by the caller feeding the
    /// right `InputBuffer` (see `resume_saved_bits`).
    pub fn restore_from_checkpoint(&mut self, window: &[u8], uc_offset: u64) {
        self.state = InflaterState::ReadingBFinal;
        self.output = OutputWindow::new();
        self.output.restore_from_dict(window);
        self.total_output_written = uc_offset;
    }

    /// Construct the `SavedBits` an `InputBuffer` should start with when
    /// resuming at a checkpoint whose `bits` LSBs of the byte at
    /// `first_byte_at_c_offset` were already consumed by the previous
    /// block.
    pub fn resume_saved_bits(bits: u8, first_byte_at_c_offset: u8) -> SavedBits {
        if bits == 0 {
            SavedBits::none()
        } else {
            SavedBits {
                buffer: (first_byte_at_c_offset >> bits) as u32,
                bits_in_buffer: 8 - bits as u32,
            }
        }
    }

    pub fn at_block_boundary(&self) -> bool {
        matches!(self.state, InflaterState::ReadingBFinal | InflaterState::Done)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, InflaterState::Done)
    }

    pub fn output_available(&self) -> usize {
        self.output.available_bytes()
    }

    pub fn total_output_written(&self) -> u64 {
        self.total_output_written
    }

    /// Drain already-decoded bytes into `dest`, returning how many were
    /// copied.
    pub fn drain(&mut self, dest: &mut [u8]) -> usize {
        self.output.copy_to(dest)
    }

    /// Slice out the most recent `min(WINDOW_SIZE, total_output_written)`
    /// bytes of history, used to build a checkpoint dictionary. Only
    /// valid to call at a block boundary, after draining all pending
    /// output (so the two halves concatenate to exactly that history).
    pub fn checkpoint_window(&self) -> (&[u8], &[u8]) {
        debug_assert_eq!(self.output.available_bytes(), 0);
        self.output.get_checkpoint_data(self.total_output_written)
    }

    /// Run one state transition. Never partially consumes input: on
    /// `NeedInput`, calling again with a buffer that has more bytes
    /// appended (same saved bits) is always safe.
    fn step(&mut self, input: &mut InputBuffer<'_>) -> Result<StepResult, DecodeError> {
        match self.state {
            InflaterState::ReadingBFinal => {
                let Some(bit) = input.get_bits(1) else {
                    return Ok(StepResult::NeedInput);
                };
                self.bfinal = bit != 0;
                self.state = InflaterState::ReadingBType;
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingBType => {
                let Some(bits) = input.get_bits(2) else {
                    return Ok(StepResult::NeedInput);
                };
                let block_type = BlockType::from_bits(bits).ok_or(DecodeError::BadBlockType)?;
                self.block_type = block_type;
                match block_type {
                    BlockType::Static => {
                        self.literal_length_tree = HuffmanTree::static_literal_length_tree();
                        self.distance_tree = HuffmanTree::static_distance_tree();
                        self.state = InflaterState::DecodeTop;
                    }
                    BlockType::Dynamic => {
                        self.state = InflaterState::ReadingNumLitCodes;
                    }
                    BlockType::Uncompressed => {
                        self.state = InflaterState::UncompressedAligning;
                    }
                }
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingNumLitCodes => {
                let Some(v) = input.get_bits(5) else {
                    return Ok(StepResult::NeedInput);
                };
                self.hlit = v as usize + 257;
                self.state = InflaterState::ReadingNumDistCodes;
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingNumDistCodes => {
                let Some(v) = input.get_bits(5) else {
                    return Ok(StepResult::NeedInput);
                };
                self.hdist = v as usize + 1;
                self.state = InflaterState::ReadingNumCodeLengthCodes;
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingNumCodeLengthCodes => {
                let Some(v) = input.get_bits(4) else {
                    return Ok(StepResult::NeedInput);
                };
                self.hclen = v as usize + 4;
                self.code_length_code_lengths = [0; 19];
                self.code_length_read_index = 0;
                self.state = InflaterState::ReadingCodeLengthCodeLengths;
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingCodeLengthCodeLengths => {
                while self.code_length_read_index < self.hclen {
                    let Some(v) = input.get_bits(3) else {
                        return Ok(StepResult::NeedInput);
                    };
                    let pos = CODE_LENGTH_ORDER[self.code_length_read_index];
                    self.code_length_code_lengths[pos] = v as u8;
                    self.code_length_read_index += 1;
                }
                self.code_length_tree
                    .new_in_place(&self.code_length_code_lengths)?;
                self.code_lengths.clear();
                self.code_length_repeat_symbol = None;
                self.state = InflaterState::ReadingTreeCodes;
                Ok(StepResult::Continue)
            }
            InflaterState::ReadingTreeCodes => {
                let symbol = if let Some(s) = self.code_length_repeat_symbol.take() {
                    s
                } else {
                    match self.code_length_tree.get_next_symbol(input)? {
                        None => return Ok(StepResult::NeedInput),
                        Some(s) => s,
                    }
                };
                match symbol {
                    0..=15 => self.code_lengths.push(symbol as u8),
                    16 => {
                        let Some(extra) = input.get_bits(2) else {
                            self.code_length_repeat_symbol = Some(16);
                            return Ok(StepResult::NeedInput);
                        };
                        let prev = *self
                            .code_lengths
                            .last()
                            .ok_or(DecodeError::InvalidRepeatCode)?;
                        for _ in 0..(3 + extra) {
                            self.code_lengths.push(prev);
                        }
                    }
                    17 => {
                        let Some(extra) = input.get_bits(3) else {
                            self.code_length_repeat_symbol = Some(17);
                            return Ok(StepResult::NeedInput);
                        };
                        for _ in 0..(3 + extra) {
                            self.code_lengths.push(0);
                        }
                    }
                    18 => {
                        let Some(extra) = input.get_bits(7) else {
                            self.code_length_repeat_symbol = Some(18);
                            return Ok(StepResult::NeedInput);
                        };
                        for _ in 0..(11 + extra) {
                            self.code_lengths.push(0);
                        }
                    }
                    _ => return Err(DecodeError::InvalidHuffmanData),
                }

                let total_needed = self.hlit + self.hdist;
                if self.code_lengths.len() >= total_needed {
                    self.code_lengths.truncate(total_needed);
                    let mut lit_lengths = [0u8; HuffmanTree::MAX_LITERAL_TREE_ELEMENTS];
                    lit_lengths[..self.hlit].copy_from_slice(&self.code_lengths[..self.hlit]);
                    let mut dist_lengths = [0u8; HuffmanTree::MAX_DIST_TREE_ELEMENTS];
                    dist_lengths[..self.hdist]
                        .copy_from_slice(&self.code_lengths[self.hlit..self.hlit + self.hdist]);
                    self.literal_length_tree.new_in_place(&lit_lengths)?;
                    self.distance_tree.new_in_place(&dist_lengths)?;
                    self.state = InflaterState::DecodeTop;
                }
                Ok(StepResult::Continue)
            }
            InflaterState::DecodeTop => {
                if self.output.free_bytes() < 1 {
                    return Ok(StepResult::NeedOutputSpace);
                }
                match self.literal_length_tree.get_next_symbol(input)? {
                    None => Ok(StepResult::NeedInput),
                    Some(sym) if sym < 256 => {
                        self.output.write(sym as u8);
                        self.total_output_written += 1;
                        Ok(StepResult::Continue)
                    }
                    Some(sym) if sym == HuffmanTree::END_OF_BLOCK_CODE as u16 => {
                        if self.bfinal {
                            self.state = InflaterState::Done;
                            Ok(StepResult::Done)
                        } else {
                            self.state = InflaterState::ReadingBFinal;
                            Ok(StepResult::BlockBoundary)
                        }
                    }
                    Some(sym) => {
                        self.pending_length_code = sym;
                        self.state = InflaterState::HaveInitialLength;
                        Ok(StepResult::Continue)
                    }
                }
            }
            InflaterState::HaveInitialLength => {
                let idx = self.pending_length_code as usize - 257;
                let (base, extra_bits) = *LENGTH_BASE_EXTRA
                    .get(idx)
                    .ok_or(DecodeError::InvalidHuffmanData)?;
                let extra = if extra_bits == 0 {
                    Some(0)
                } else {
                    input.get_bits(extra_bits as u32)
                };
                let Some(extra) = extra else {
                    return Ok(StepResult::NeedInput);
                };
                self.pending_length = base as usize + extra as usize;
                self.state = InflaterState::HaveFullLength;
                Ok(StepResult::Continue)
            }
            InflaterState::HaveFullLength => match self.distance_tree.get_next_symbol(input)? {
                None => Ok(StepResult::NeedInput),
                Some(sym) => {
                    self.pending_distance_code = sym;
                    self.state = InflaterState::HaveDistCode;
                    Ok(StepResult::Continue)
                }
            },
            InflaterState::HaveDistCode => {
                if self.output.free_bytes() < self.pending_length {
                    return Ok(StepResult::NeedOutputSpace);
                }
                let idx = self.pending_distance_code as usize;
                let (base, extra_bits) = *DIST_BASE_EXTRA
                    .get(idx)
                    .ok_or(DecodeError::InvalidHuffmanData)?;
                let extra = if extra_bits == 0 {
                    Some(0)
                } else {
                    input.get_bits(extra_bits as u32)
                };
                let Some(extra) = extra else {
                    return Ok(StepResult::NeedInput);
                };
                let distance = base as usize + extra as usize;
                if distance as u64 > self.total_output_written || distance > WINDOW_SIZE {
                    return Err(DecodeError::DistanceTooFar);
                }
                self.output
                    .write_length_distance(self.pending_length, distance);
                self.total_output_written += self.pending_length as u64;
                self.state = InflaterState::DecodeTop;
                Ok(StepResult::Continue)
            }
            InflaterState::UncompressedAligning => {
                input.align_to_byte();
                self.uncompressed_header_index = 0;
                self.state = InflaterState::UncompressedHeader;
                Ok(StepResult::Continue)
            }
            InflaterState::UncompressedHeader => {
                while self.uncompressed_header_index < 4 {
                    let Some(b) = input.get_bits(8) else {
                        return Ok(StepResult::NeedInput);
                    };
                    self.uncompressed_header[self.uncompressed_header_index] = b as u8;
                    self.uncompressed_header_index += 1;
                }
                let len = u16::from_le_bytes([
                    self.uncompressed_header[0],
                    self.uncompressed_header[1],
                ]);
                let nlen = u16::from_le_bytes([
                    self.uncompressed_header[2],
                    self.uncompressed_header[3],
                ]);
                if len != !nlen {
                    return Err(DecodeError::BadStoredBlockLength);
                }
                self.block_length = len as usize;
                if self.block_length == 0 {
                    if self.bfinal {
                        self.state = InflaterState::Done;
                        return Ok(StepResult::Done);
                    }
                    self.state = InflaterState::ReadingBFinal;
                    return Ok(StepResult::BlockBoundary);
                }
                self.state = InflaterState::DecodingUncompressed;
                Ok(StepResult::Continue)
            }
            InflaterState::DecodingUncompressed => {
                if self.output.free_bytes() == 0 {
                    return Ok(StepResult::NeedOutputSpace);
                }
                let copied = self.output.copy_from(input, self.block_length);
                self.block_length -= copied;
                self.total_output_written += copied as u64;
                if self.block_length == 0 {
                    if self.bfinal {
                        self.state = InflaterState::Done;
                        return Ok(StepResult::Done);
                    }
                    self.state = InflaterState::ReadingBFinal;
                    Ok(StepResult::BlockBoundary)
                } else if copied == 0 {
                    Ok(StepResult::NeedInput)
                } else {
                    Ok(StepResult::Continue)
                }
            }
            InflaterState::Done => Ok(StepResult::Done),
        }
    }

    fn step_many(&mut self, input: &mut InputBuffer<'_>) -> Result<StepResult, DecodeError> {
        loop {
            match self.step(input)? {
                StepResult::Continue => continue,
                other => return Ok(other),
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives an `Inflater` over a `Read` source, handling the chunked
/// refill loop the state machine's `NeedInput` pauses require, and
/// tracking the compressed byte offset so checkpoints can be taken.
pub(crate) struct DeflateStream<R> {
    reader: R,
    chunk: Vec<u8>,
    chunk_offset: usize,
    file_pos: u64,
    saved_bits: SavedBits,
    inflater: Inflater,
    eof: bool,
}

const CHUNK_SIZE: usize = 64 * 1024;

impl<R: Read> DeflateStream<R> {
    /// Begin decoding from the start of the raw deflate payload (the
    /// gzip member header must already have been consumed from `reader`).
    pub fn open_sequential(reader: R) -> Self {
        Self {
            reader,
            chunk: Vec::new(),
            chunk_offset: 0,
            file_pos: 0,
            saved_bits: SavedBits::none(),
            inflater: Inflater::new(),
            eof: false,
        }
    }

    /// Resume decoding starting at a checkpoint: `c_offset` is the
    /// compressed byte offset of the first not-fully-consumed byte,
    /// `bits` is how many of its low bits were already consumed by the
    /// previous block, and `window` is the checkpoint's history
    /// dictionary. `reader` must already be positioned at `c_offset`
    /// (when `bits > 0` the caller must NOT have consumed that byte yet;
    /// `resume_at` reads it here).
    pub fn resume_at(
        mut reader: R,
        c_offset: u64,
        bits: u8,
        window: &[u8],
        uc_offset: u64,
    ) -> std::io::Result<Self> {
        let saved_bits = if bits == 0 {
            SavedBits::none()
        } else {
            let mut b = [0u8; 1];
            reader.read_exact(&mut b)?;
            Inflater::resume_saved_bits(bits, b[0])
        };
        let mut inflater = Inflater::new();
        inflater.restore_from_checkpoint(window, uc_offset);
        Ok(Self {
            reader,
            chunk: Vec::new(),
            chunk_offset: 0,
            file_pos: c_offset + if bits == 0 { 0 } else { 1 },
            saved_bits,
            inflater,
            eof: false,
        })
    }

    pub fn total_output_written(&self) -> u64 {
        self.inflater.total_output_written()
    }

    pub fn is_done(&self) -> bool {
        self.inflater.is_done()
    }

    pub fn at_block_boundary(&self) -> bool {
        self.inflater.at_block_boundary()
    }

    /// The compressed-offset / sub-byte-bit pair a checkpoint should
    /// record for the current position. Only meaningful when
    /// `at_block_boundary()` is true.
    ///
    /// `file_pos` counts every byte physically pulled out of `reader`
    /// into the bit buffer so far. The only ones not yet "consumed" by
    /// the decoder are the `bits_in_buffer` bits still parked in
    /// `saved_bits` (always fewer than 8 at a block boundary, since the
    /// decoder only pauses there between whole Huffman symbols once byte
    /// framing has settled). `c_offset` is the byte those leftover bits
    /// belong to; `bits` is how many of its low bits are already spent.
    pub fn current_c_offset_and_bits(&self) -> (u64, u8) {
        let bits_in_buffer = self.saved_bits.bits_in_buffer as u64;
        let consumed_bits = self.file_pos * 8 - bits_in_buffer;
        (consumed_bits / 8, (consumed_bits % 8) as u8)
    }

    pub fn checkpoint_window(&self) -> (&[u8], &[u8]) {
        self.inflater.checkpoint_window()
    }

    /// Decode forward, appending to `out` until it has grown by at least
    /// `want` bytes or the stream ends. Returns the number of bytes
    /// actually appended (less than `want` only at end of stream).
    pub fn fill(&mut self, out: &mut Vec<u8>, want: usize) -> crate::error::Result<usize> {
        let start_len = out.len();
        let target = start_len + want;
        loop {
            while out.len() < target && self.inflater.output_available() > 0 {
                let before = out.len();
                let room = (target - before).min(self.inflater.output_available());
                out.resize(before + room, 0);
                let n = self.inflater.drain(&mut out[before..]);
                out.truncate(before + n);
            }
            if out.len() >= target || self.inflater.is_done() {
                return Ok(out.len() - start_len);
            }
            self.refill_and_step()?;
        }
    }

    #[cfg(test)]
    pub(crate) fn total_read_from_reader(&self) -> u64 {
        self.file_pos
    }

    /// Drain all currently-buffered output (used before taking a
    /// checkpoint, so the history window and `total_output_written`
    /// bookkeeping are consistent).
    pub fn drain_all(&mut self, out: &mut Vec<u8>) {
        let avail = self.inflater.output_available();
        if avail == 0 {
            return;
        }
        let before = out.len();
        out.resize(before + avail, 0);
        let n = self.inflater.drain(&mut out[before..]);
        out.truncate(before + n);
    }

    /// Drive the decoder forward exactly to its next block boundary (or
    /// end of stream), draining whatever output that produced into
    /// `out`. Returns `true` if a boundary was reached with more stream
    /// left, `false` at end of stream. Used by the indexer, which must
    /// inspect `at_block_boundary()` between every block rather than
    /// after an arbitrary amount of output as `fill` does.
    pub fn step_to_next_boundary(&mut self, out: &mut Vec<u8>) -> crate::error::Result<bool> {
        loop {
            self.drain_all(out);
            if self.inflater.is_done() {
                return Ok(false);
            }
            if self.refill_and_step()? {
                self.drain_all(out);
                return Ok(true);
            }
        }
    }

    /// Runs one `step_many` over the currently buffered/refilled input.
    /// Returns `Ok(true)` if a block boundary was just reached.
    fn refill_and_step(&mut self) -> crate::error::Result<bool> {
        if self.chunk_offset >= self.chunk.len() && !self.eof {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = self.reader.read(&mut buf)?;
            buf.truncate(n);
            self.chunk = buf;
            self.chunk_offset = 0;
            if n == 0 {
                self.eof = true;
            }
        }
        let slice = &self.chunk[self.chunk_offset..];
        let mut input = InputBuffer::new(slice, self.saved_bits);
        let step_err_offset = self.file_pos;
        let result = self.inflater.step_many(&mut input);
        let read_bytes = input.read_bytes;
        self.saved_bits = input.saved_bits();
        self.chunk_offset += read_bytes;
        self.file_pos += read_bytes as u64;
        match result {
            Ok(StepResult::NeedInput) => {
                if self.eof && read_bytes == 0 {
                    return Err(crate::error::Error::CorruptStream {
                        c_offset: self.file_pos,
                        reason: "truncated deflate stream".into(),
                    });
                }
                Ok(false)
            }
            Ok(StepResult::BlockBoundary) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) => Err(crate::error::Error::CorruptStream {
                c_offset: step_err_offset,
                reason: e.to_string(),
            }),
        }
    }
}

impl From<DecodeError> for crate::error::Error {
    fn from(e: DecodeError) -> Self {
        crate::error::Error::CorruptStream {
            c_offset: 0,
            reason: e.to_string(),
        }
    }
}
