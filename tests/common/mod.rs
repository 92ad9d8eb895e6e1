//! Shared gzip trace fixtures for the integration tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// Builds a single-member gzip file from `lines` (no trailing newline is
/// added beyond one per line) at `<dir>/trace.pfw.gz`, returning the
/// owning temp dir (keep it alive as long as the path is used) and the
/// path itself.
pub fn gzip_lines(dir: &TempDir, lines: &[String]) -> PathBuf {
    let path = dir.path().join("trace.pfw.gz");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(enc, "{line}").unwrap();
    }
    let data = enc.finish().unwrap();
    std::fs::write(&path, &data).unwrap();
    path
}

/// `count` lines, each a JSON object whose total encoded length
/// (including the trailing newline) is exactly `width` bytes, padded
/// with a filler field so file layout is predictable for chunk-boundary
/// tests.
pub fn fixed_width_json_lines(count: usize, width: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let prefix = format!(r#"{{"id":{i:08},"pad":""#);
            let suffix = "\"}";
            let pad_len = width
                .checked_sub(prefix.len() + suffix.len() + 1)
                .expect("width too small for fixed-width line");
            format!("{prefix}{}{suffix}", "x".repeat(pad_len))
        })
        .collect()
}

/// Decompresses the whole gzip file the ordinary way, for use as a
/// reference oracle against the checkpointed reader.
pub fn reference_decompress(path: &Path) -> Vec<u8> {
    use flate2::read::GzDecoder;
    use std::io::Read;
    let file = std::fs::File::open(path).unwrap();
    let mut decoder = GzDecoder::new(file);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
}
