//! Content fingerprint used to detect a stale index: source file size,
//! modification time, and a hash of the first 4 KiB. Cheap enough to
//! check on every open without reading the whole (possibly multi-GB)
//! source file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

const PREFIX_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    pub size: u64,
    pub mtime: i64,
    pub prefix_hash: u64,
}

impl Fingerprint {
    pub fn of_path(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let meta = file.metadata()?;
        let size = meta.len();
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut prefix = vec![0u8; PREFIX_LEN.min(size as usize)];
        file.read_exact(&mut prefix)?;
        let prefix_hash = fnv1a(&prefix);

        Ok(Self {
            size,
            mtime,
            prefix_hash,
        })
    }
}

/// FNV-1a: small, dependency-free, and more than adequate for detecting
/// "this file changed since the index was built" rather than for any
/// cryptographic purpose.
fn fnv1a(data: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_is_deterministic() {
        assert_eq!(fnv1a(b"hello"), fnv1a(b"hello"));
        assert_ne!(fnv1a(b"hello"), fnv1a(b"world"));
    }
}
