//! Line & JSON framers: stateless functions turning a decoded byte run
//! into complete `\n`-terminated lines. Ownership of a line that starts
//! inside `[start, end)` but isn't finished by `end` always goes to
//! *this* call regardless of where its terminator ends up (bounded by
//! [`TRAILING_PEEK_BOUND`]); a subsequent chunk beginning at `end` will
//! in turn reject that same line because its start offset is before
//! that chunk's own `start`. That asymmetry is what keeps a line
//! straddling two adjacent chunks from being emitted by both or by
//! neither, no matter how `[0, U)` is partitioned.

use std::io::Read;

use crate::error::Result;
use crate::inflate::DeflateStream;

/// How far past `end` we're willing to decode looking for the
/// terminator of a line that starts inside `[start, end)` but wasn't
/// finished by `end`. Bounded so a corrupt or pathological stream can't
/// make a single read unboundedly expensive; a genuine line longer than
/// this is dropped rather than returned truncated.
const TRAILING_PEEK_BOUND: usize = 1 << 20;

/// `buf` holds the decoded bytes `[checkpoint_uc, checkpoint_uc +
/// buf.len())`; `stream` is positioned to continue emitting output right
/// after `buf` ends, used only if the last in-progress line needs a
/// peek past `end` to find its terminator.
pub(super) fn frame_line_bytes<R: Read>(
    stream: &mut DeflateStream<R>,
    buf: &[u8],
    checkpoint_uc: u64,
    start: u64,
    end: u64,
) -> Result<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    let mut line_start_idx = 0usize;

    for (i, &byte) in buf.iter().enumerate() {
        if byte != b'\n' {
            continue;
        }
        let line_start_off = checkpoint_uc + line_start_idx as u64;
        let line_end_off = checkpoint_uc + i as u64;
        if line_start_off >= start && line_end_off < end {
            lines.push(buf[line_start_idx..i].to_vec());
        }
        line_start_idx = i + 1;
    }

    let trailing_start_off = checkpoint_uc + line_start_idx as u64;
    if trailing_start_off >= start && trailing_start_off < end {
        let mut extra = Vec::new();
        stream.fill(&mut extra, TRAILING_PEEK_BOUND)?;
        if let Some(p) = extra.iter().position(|&b| b == b'\n') {
            let mut full = Vec::with_capacity(buf.len() - line_start_idx + p);
            full.extend_from_slice(&buf[line_start_idx..]);
            full.extend_from_slice(&extra[..p]);
            lines.push(full);
        }
        // else: no terminator within the bound; an unterminated trailing
        // run is not a Line by definition (see GLOSSARY) and is dropped.
    }

    Ok(lines)
}

/// Decodes forward from a checkpoint whose cumulative line count is
/// `checkpoint_lines`, skipping to 0-based line `first_line`, and
/// collects `count` complete lines from there.
pub(super) fn frame_lines_by_number<R: Read>(
    stream: &mut DeflateStream<R>,
    checkpoint_lines: u64,
    first_line: u64,
    count: usize,
) -> Result<Vec<Vec<u8>>> {
    let mut lines_to_skip = first_line - checkpoint_lines;
    let mut result = Vec::with_capacity(count);
    let mut pending = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = stream.fill(&mut buf, 64 * 1024)?;
        if n == 0 {
            break;
        }
        for &byte in &buf {
            if byte == b'\n' {
                if lines_to_skip > 0 {
                    lines_to_skip -= 1;
                    pending.clear();
                } else {
                    result.push(std::mem::take(&mut pending));
                    if result.len() == count {
                        return Ok(result);
                    }
                }
            } else if lines_to_skip == 0 {
                pending.push(byte);
            }
        }
    }

    if result.len() != count {
        return Err(crate::error::Error::CorruptStream {
            c_offset: 0,
            reason: "stream ended before the requested line range was fully read".into(),
        });
    }
    Ok(result)
}
