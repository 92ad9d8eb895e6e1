//! On-disk index layout: a fixed-width header followed by a flat array
//! of fixed-width-plus-blob checkpoint records. Little-endian
//! throughout; field widths are fixed so the file is seek-navigable
//! after reading just the header.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

pub(crate) const MAGIC: &[u8; 8] = b"DFTIDX01";
pub(crate) const VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 8 + 8 + 8 + 8 + 8 + 8 + 8;

#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub checkpoint_size: u64,
    pub uncompressed_size: u64,
    pub total_lines: u64,
    pub source_size: u64,
    pub source_mtime: i64,
    pub source_prefix_hash: u64,
    pub checkpoint_count: u64,
}

impl Header {
    pub fn matches_fingerprint(&self, fp: &Fingerprint) -> bool {
        self.source_size == fp.size
            && self.source_mtime == fp.mtime
            && self.source_prefix_hash == fp.prefix_hash
    }
}

/// A single persisted checkpoint record: everything the in-memory
/// `Checkpoint` carries except the decompressed window, which is kept
/// on disk compressed and only materialized on demand by the reader.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub uc_offset: u64,
    pub uc_size: u64,
    pub c_offset: u64,
    pub bits: u8,
    pub num_lines: u64,
    pub line_offset_in_block: u64,
    pub dict_compressed: Vec<u8>,
    pub dict_len: u32,
}

pub(crate) fn write_atomic(
    path: &Path,
    header: &Header,
    records: &[Record],
) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut w = BufWriter::new(file);
        write_header(&mut w, header)?;
        for record in records {
            write_record(&mut w, record)?;
        }
        w.flush()?;
        w.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::path::PathBuf::from(tmp)
}

fn write_header<W: Write>(w: &mut W, h: &Header) -> Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&h.checkpoint_size.to_le_bytes())?;
    w.write_all(&h.uncompressed_size.to_le_bytes())?;
    w.write_all(&h.total_lines.to_le_bytes())?;
    w.write_all(&h.source_size.to_le_bytes())?;
    w.write_all(&h.source_mtime.to_le_bytes())?;
    w.write_all(&h.source_prefix_hash.to_le_bytes())?;
    w.write_all(&h.checkpoint_count.to_le_bytes())?;
    Ok(())
}

fn write_record<W: Write>(w: &mut W, r: &Record) -> Result<()> {
    w.write_all(&r.uc_offset.to_le_bytes())?;
    w.write_all(&r.uc_size.to_le_bytes())?;
    w.write_all(&r.c_offset.to_le_bytes())?;
    w.write_all(&[r.bits])?;
    w.write_all(&r.num_lines.to_le_bytes())?;
    w.write_all(&r.line_offset_in_block.to_le_bytes())?;
    w.write_all(&r.dict_len.to_le_bytes())?;
    w.write_all(&r.dict_compressed)?;
    Ok(())
}

pub(crate) fn read(path: &Path) -> Result<(Header, Vec<Record>)> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);
    let header = read_header(&mut r)?;
    let mut records = Vec::with_capacity(header.checkpoint_count as usize);
    for _ in 0..header.checkpoint_count {
        records.push(read_record(&mut r)?);
    }
    Ok((header, records))
}

fn read_header<R: Read>(r: &mut R) -> Result<Header> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic).map_err(|_| Error::CorruptIndex("truncated header".into()))?;
    if &magic != MAGIC {
        return Err(Error::CorruptIndex("bad magic".into()));
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(Error::CorruptIndex(format!(
            "unsupported index version {version}"
        )));
    }
    Ok(Header {
        checkpoint_size: read_u64(r)?,
        uncompressed_size: read_u64(r)?,
        total_lines: read_u64(r)?,
        source_size: read_u64(r)?,
        source_mtime: read_i64(r)?,
        source_prefix_hash: read_u64(r)?,
        checkpoint_count: read_u64(r)?,
    })
}

fn read_record<R: Read>(r: &mut R) -> Result<Record> {
    let uc_offset = read_u64(r)?;
    let uc_size = read_u64(r)?;
    let c_offset = read_u64(r)?;
    let mut bits_buf = [0u8; 1];
    r.read_exact(&mut bits_buf)?;
    let bits = bits_buf[0];
    if bits > 7 {
        return Err(Error::CorruptIndex(format!("invalid bit offset {bits}")));
    }
    let num_lines = read_u64(r)?;
    let line_offset_in_block = read_u64(r)?;
    let dict_len = read_u32(r)?;
    let mut dict_compressed = vec![0u8; dict_len as usize];
    // dict_len here is the *compressed* blob length read right after it;
    // see `read_dict_compressed` below for the on-disk nuance.
    r.read_exact(&mut dict_compressed)?;
    Ok(Record {
        uc_offset,
        uc_size,
        c_offset,
        bits,
        num_lines,
        line_offset_in_block,
        dict_compressed,
        dict_len,
    })
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|_| Error::CorruptIndex("truncated record".into()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|_| Error::CorruptIndex("truncated record".into()))?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|_| Error::CorruptIndex("truncated record".into()))?;
    Ok(i64::from_le_bytes(buf))
}

#[allow(dead_code)]
pub(crate) const _HEADER_LEN_CHECK: usize = HEADER_LEN;
