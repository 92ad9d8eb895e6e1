//! Minimal single-member gzip header parsing (RFC 1952 §2.3).
//!
//! We only need to find the byte offset at which the raw deflate payload
//! begins; the trailer (CRC32 + ISIZE) is not consulted anywhere in this
//! crate since checkpoints let us verify correctness by resuming, not by
//! re-checksumming the whole file.

use std::io::Read;

use crate::error::{Error, Result};

const MAGIC: [u8; 2] = [0x1f, 0x8b];
const DEFLATE_METHOD: u8 = 8;

const FTEXT: u8 = 1 << 0;
const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

/// Reads and validates a gzip member header, returning the number of
/// bytes consumed from `r` (i.e. the compressed offset of the first
/// deflate block).
pub(crate) fn skip_gzip_header<R: Read>(r: &mut R) -> Result<u64> {
    let mut consumed = 0u64;
    let mut hdr = [0u8; 10];
    read_exact_counted(r, &mut hdr, &mut consumed)?;

    if hdr[0] != MAGIC[0] || hdr[1] != MAGIC[1] {
        return Err(Error::CorruptStream {
            c_offset: 0,
            reason: "not a gzip stream (bad magic)".into(),
        });
    }
    if hdr[2] != DEFLATE_METHOD {
        return Err(Error::CorruptStream {
            c_offset: 2,
            reason: format!("unsupported compression method {}", hdr[2]),
        });
    }
    let flg = hdr[3];
    let _ = FTEXT; // not used for anything but documents the bit

    if flg & FEXTRA != 0 {
        let mut xlen_buf = [0u8; 2];
        read_exact_counted(r, &mut xlen_buf, &mut consumed)?;
        let xlen = u16::from_le_bytes(xlen_buf) as usize;
        skip_counted(r, xlen, &mut consumed)?;
    }
    if flg & FNAME != 0 {
        skip_cstring(r, &mut consumed)?;
    }
    if flg & FCOMMENT != 0 {
        skip_cstring(r, &mut consumed)?;
    }
    if flg & FHCRC != 0 {
        let mut crc16 = [0u8; 2];
        read_exact_counted(r, &mut crc16, &mut consumed)?;
    }

    Ok(consumed)
}

fn read_exact_counted<R: Read>(r: &mut R, buf: &mut [u8], consumed: &mut u64) -> Result<()> {
    r.read_exact(buf)?;
    *consumed += buf.len() as u64;
    Ok(())
}

fn skip_counted<R: Read>(r: &mut R, mut n: usize, consumed: &mut u64) -> Result<()> {
    let mut scratch = [0u8; 256];
    while n > 0 {
        let take = n.min(scratch.len());
        r.read_exact(&mut scratch[..take])?;
        *consumed += take as u64;
        n -= take;
    }
    Ok(())
}

fn skip_cstring<R: Read>(r: &mut R, consumed: &mut u64) -> Result<()> {
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)?;
        *consumed += 1;
        if byte[0] == 0 {
            break;
        }
    }
    Ok(())
}
