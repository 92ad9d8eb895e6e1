//! Round-trip correctness, checkpoint monotonicity, resume correctness,
//! boundary clamping, and a handful of end-to-end scenarios covering
//! stale/corrupt/force-rebuild handling.

mod common;

use dftracer_gzidx::{Error, Indexer, Reader};

fn build(dir: &tempfile::TempDir, path: &std::path::Path, checkpoint_size: u64) -> Indexer {
    let mut indexer = Indexer::new(path, None, checkpoint_size, false).unwrap();
    indexer.build().unwrap();
    let _ = dir;
    indexer
}

#[test]
fn round_trip_whole_file_matches_reference_decompression() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(500, 128);
    let path = common::gzip_lines(&dir, &lines);

    build(&dir, &path, 16 * 1024);
    let reference = common::reference_decompress(&path);

    let mut reader = Reader::new(&path, None).unwrap();
    let got = reader.read_bytes(0, reference.len() as u64).unwrap();
    assert_eq!(got, reference);
}

#[test]
fn checkpoint_monotonicity_holds() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(2000, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 8 * 1024);
    let checkpoints = indexer.checkpoints();
    assert!(checkpoints.len() > 1, "expected multiple checkpoints for this file size/interval");

    for w in checkpoints.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        assert!(a.uc_offset <= b.uc_offset);
        assert!(a.c_offset <= b.c_offset);
        assert!(a.num_lines <= b.num_lines);
        assert_eq!(a.uc_offset + a.uc_size, b.uc_offset);
    }
    assert_eq!(checkpoints[0].uc_offset, 0);
}

#[test]
fn resume_correctness_for_every_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(2000, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 8 * 1024);
    let reference = common::reference_decompress(&path);
    let max_bytes = indexer.max_bytes();
    assert_eq!(reference.len() as u64, max_bytes);

    let mut reader = Reader::new(&path, None).unwrap();
    for cp in indexer.checkpoints() {
        let tail = reader.read_bytes(cp.uc_offset, max_bytes).unwrap();
        assert_eq!(tail, &reference[cp.uc_offset as usize..]);
    }
}

#[test]
fn boundary_clamp_behaviour() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(200, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 64 * 1024);
    let max_bytes = indexer.max_bytes();

    let mut reader = Reader::new(&path, None).unwrap();
    let last_ten = reader.read_bytes(max_bytes - 10, max_bytes).unwrap();
    assert_eq!(last_ten.len(), 10);

    let err = reader.read_bytes(max_bytes, max_bytes + 1).unwrap_err();
    assert!(matches!(err, Error::OutOfRange(_)));
}

#[test]
fn line_number_consistency() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(300, 200);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 16 * 1024);
    let total = indexer.num_lines();
    assert_eq!(total, 300);

    let mut reader = Reader::new(&path, None).unwrap();
    let all = reader.read_lines(1, total).unwrap();
    assert_eq!(all.len() as u64, total);
}

/// A checkpoint's `num_lines` counts completed lines strictly before its
/// `uc_offset`, so a checkpoint can already equal a line's number while
/// still sitting partway through that line's bytes (`line_offset_in_block
/// > 0`). `read_lines` must resolve such a request to the line's full
/// content, not the truncated tail decoded from the checkpoint onward.
#[test]
fn read_lines_reconstructs_full_line_when_checkpoint_lands_mid_line() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(300, 200);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 16 * 1024);
    let checkpoints = indexer.checkpoints();

    let mid_line_cp = checkpoints
        .iter()
        .skip(1)
        .find(|cp| cp.line_offset_in_block > 0)
        .expect("fixture expected to produce at least one mid-line checkpoint");

    // `num_lines` is the 0-based index of the line the checkpoint sits
    // inside; 1-based line number `num_lines + 1` names that same line.
    let line_number = mid_line_cp.num_lines + 1;

    let mut reader = Reader::new(&path, None).unwrap();
    let got = reader.read_lines(line_number, line_number).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0], lines[(line_number - 1) as usize].as_bytes());
}

/// 100 fixed-width lines with one big checkpoint interval, so the
/// whole file is covered by the single implicit checkpoint at offset 0.
#[test]
fn scenario_single_checkpoint_small_file() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..100).map(|i| format!("line-{i:04}")).collect();
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 64 * 1024);
    assert_eq!(indexer.num_lines(), 100);
    let checkpoints = indexer.checkpoints();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].uc_offset, 0);

    let mut reader = Reader::new(&path, None).unwrap();
    let all = reader.read_lines(1, 100).unwrap();
    assert_eq!(all.len(), 100);
}

/// Damaging the gzip source after the index is already built surfaces
/// `CorruptStream` only once a read crosses the damaged region; earlier
/// reads confined to undamaged data still succeed. The corruption is
/// applied in place, well past the fingerprint's 4 KiB prefix and
/// without changing the file's length, so the index is still fresh by
/// fingerprint and the damage is only discovered by actually decoding
/// across it, not by the staleness check.
#[test]
fn scenario_corrupted_stream_after_build() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(4000, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 8 * 1024);
    let max_bytes = indexer.max_bytes();

    let mut data = std::fs::read(&path).unwrap();
    let corrupt_at = data.len() * 3 / 4;
    let corrupt_len = (data.len() - corrupt_at).min(256);
    for b in &mut data[corrupt_at..corrupt_at + corrupt_len] {
        *b = 0xFF;
    }
    std::fs::write(&path, &data).unwrap();

    // Same size, same prefix, same mtime second: the index is still
    // fresh, so a read confined to undamaged data still succeeds.
    let mut reader = Reader::new(&path, None).unwrap();
    let early = reader.read_bytes(0, 1024);
    assert!(early.is_ok(), "expected an early read to survive corruption past it");

    // A read that spans the whole stream crosses the damaged region and
    // must fail.
    let mut reader2 = Reader::new(&path, None).unwrap();
    let whole = reader2.read_bytes(0, max_bytes);
    assert!(matches!(whole, Err(Error::CorruptStream { .. }) | Err(Error::Io(_))));
}

/// Force-rebuilding an already-valid index still produces a consistent
/// index, and a reader opened against the pre-rebuild index keeps
/// working off its own loaded snapshot.
#[test]
fn scenario_force_rebuild_keeps_existing_readers_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(500, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 16 * 1024);
    let max_bytes = indexer.max_bytes();

    let mut reader = Reader::new(&path, None).unwrap();

    let mut rebuilder = Indexer::new(&path, None, 16 * 1024, true).unwrap();
    assert!(rebuilder.needs_rebuild().unwrap());
    rebuilder.build().unwrap();
    assert_eq!(rebuilder.max_bytes(), max_bytes);

    // the reader opened before the rebuild is unaffected.
    let bytes = reader.read_bytes(0, max_bytes).unwrap();
    assert_eq!(bytes.len() as u64, max_bytes);
}

/// 1-based inclusive line ranges reject 0.
#[test]
fn scenario_zero_based_line_request_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(50, 128);
    let path = common::gzip_lines(&dir, &lines);

    build(&dir, &path, 64 * 1024);
    let mut reader = Reader::new(&path, None).unwrap();
    let err = reader.read_lines(0, 5).unwrap_err();
    assert!(matches!(err, Error::OutOfRange(_)));
}

/// `find_checkpoint(0)` is the documented sentinel, never a synthesized
/// record.
#[test]
fn scenario_find_checkpoint_zero_is_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(2000, 128);
    let path = common::gzip_lines(&dir, &lines);

    let indexer = build(&dir, &path, 8 * 1024);
    assert_eq!(indexer.find_checkpoint(0), None);
}

#[test]
fn needs_rebuild_false_for_fresh_index() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(100, 128);
    let path = common::gzip_lines(&dir, &lines);

    build(&dir, &path, 16 * 1024);
    let indexer = Indexer::new(&path, None, 16 * 1024, false).unwrap();
    assert!(!indexer.needs_rebuild().unwrap());
}

#[test]
fn stale_index_is_detected_after_source_changes() {
    let dir = tempfile::tempdir().unwrap();
    let lines = common::fixed_width_json_lines(100, 128);
    let path = common::gzip_lines(&dir, &lines);

    build(&dir, &path, 16 * 1024);

    // Rewrite the source with different content; size changes, so the
    // fingerprint no longer matches even if mtime granularity doesn't
    // change within the same test run.
    let new_lines = common::fixed_width_json_lines(100, 256);
    common::gzip_lines(&dir, &new_lines);

    let indexer = Indexer::new(&path, None, 16 * 1024, false).unwrap();
    assert!(indexer.needs_rebuild().unwrap());
}
