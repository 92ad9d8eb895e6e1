//! Line-bytes boundary semantics, JSON framing, the range iterator, and
//! the convenience layer.

mod common;

use dftracer_gzidx::{open_range_iterator, Indexer, RangeChunk, ReadMode, Reader};

fn indexed(dir: &tempfile::TempDir, lines: &[String], checkpoint_size: u64) -> std::path::PathBuf {
    let path = common::gzip_lines(dir, lines);
    let mut indexer = Indexer::new(&path, None, checkpoint_size, false).unwrap();
    indexer.build().unwrap();
    path
}

/// Ownership of a line that straddles a chunk boundary goes to whichever
/// chunk's range contains its *start* offset, never to a chunk it only
/// extends into — this is what makes "emitted by both or neither"
/// impossible regardless of how `[0, U)` is partitioned. A line whose
/// start falls before `start` is excluded (it belongs to the earlier
/// chunk); a line whose start falls inside `[start, end)` is included
/// even if its terminator lands past `end` (it belongs to *this*
/// chunk, and the following chunk will in turn exclude it by its own
/// `p < start` rule).
#[test]
fn line_bytes_ownership_follows_the_straddling_lines_start_offset() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = vec!["aaaa".into(), "bbbb".into(), "cccc".into(), "dddd".into()];
    let path = indexed(&dir, &lines, 64 * 1024);

    // Layout: "aaaa\nbbbb\ncccc\ndddd\n" — each line is 5 bytes
    // including its terminator, so line i occupies [5*i, 5*i+5).
    let mut reader = Reader::new(&path, None).unwrap();

    // [0, 6) ends mid-way through "bbbb\n" (offset 6, inside "bbbb"):
    // "bbbb" starts at 5, which is >= 0 and < 6, so this chunk owns it
    // even though its terminator (9) is past 6.
    let first = reader.read_line_bytes(0, 6).unwrap();
    assert_eq!(first, vec![b"aaaa".to_vec(), b"bbbb".to_vec()]);

    // [6, 17) starts inside "bbbb" (already claimed above) and ends
    // inside "dddd": "bbbb" is excluded (its start, 5, is < 6), "cccc"
    // is wholly inside, "dddd" starts at 15 (>= 6, < 17) so this chunk
    // claims it too, even though its terminator (19) is past 17.
    let middle = reader.read_line_bytes(6, 17).unwrap();
    assert_eq!(middle, vec![b"cccc".to_vec(), b"dddd".to_vec()]);

    // [17, 20): "dddd" was already claimed by the previous chunk (its
    // start, 15, is < 17), so nothing is left to emit here.
    let last = reader.read_line_bytes(17, 20).unwrap();
    assert!(last.is_empty());

    // Concatenating the three chunks reproduces the whole-range read
    // exactly once per line.
    let whole = reader.read_line_bytes(0, 20).unwrap();
    let mut concatenated = first;
    concatenated.extend(middle);
    concatenated.extend(last);
    assert_eq!(concatenated, whole);
}

#[test]
fn line_bytes_whole_range_returns_every_line_once() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..50).map(|i| format!("row-{i}")).collect();
    let path = indexed(&dir, &lines, 64 * 1024);

    let mut reader = Reader::new(&path, None).unwrap();
    let max_bytes = reader.max_bytes();
    let got = reader.read_line_bytes(0, max_bytes).unwrap();
    assert_eq!(got.len(), 50);
    for (i, line) in got.iter().enumerate() {
        assert_eq!(line, format!("row-{i}").as_bytes());
    }
}

#[test]
fn json_lines_parse_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..10)
        .map(|i| format!(r#"{{"idx":{i},"ok":true}}"#))
        .collect();
    let path = indexed(&dir, &lines, 64 * 1024);

    let mut reader = Reader::new(&path, None).unwrap();
    let values = reader.read_lines_json(1, 10).unwrap();
    assert_eq!(values.len(), 10);
    for (i, v) in values.iter().enumerate() {
        assert_eq!(v.get("idx").and_then(|x| x.as_u64()), Some(i as u64));
    }
}

/// Malformed JSON lines degrade to `null` rather than aborting the
/// whole batch.
#[test]
fn malformed_json_line_becomes_null_without_failing_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let lines = vec![
        r#"{"a":1}"#.to_string(),
        "not json at all".to_string(),
        r#"{"a":3}"#.to_string(),
    ];
    let path = indexed(&dir, &lines, 64 * 1024);

    let mut reader = Reader::new(&path, None).unwrap();
    let values = reader.read_lines_json(1, 3).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].get("a").and_then(|v| v.as_u64()), Some(1));
    assert!(values[1].is_null());
    assert_eq!(values[2].get("a").and_then(|v| v.as_u64()), Some(3));
}

#[test]
fn range_iterator_covers_every_byte_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..400).map(|i| format!("entry-{i:04}")).collect();
    let path = indexed(&dir, &lines, 8 * 1024);

    let reader = Reader::new(&path, None).unwrap();
    let max_bytes = reader.max_bytes();
    let mut iter = reader.into_range_iter(0, max_bytes, ReadMode::Bytes, 4096).unwrap();

    let mut assembled = Vec::new();
    while let Some(chunk) = iter.next_chunk() {
        match chunk.unwrap() {
            RangeChunk::Bytes(b) => assembled.extend(b),
            _ => panic!("expected Bytes chunks"),
        }
    }
    assert!(iter.is_done());

    let mut whole_reader = iter.into_reader();
    let reference = whole_reader.read_bytes(0, max_bytes).unwrap();
    assert_eq!(assembled, reference);
}

#[test]
fn range_iterator_lines_mode_visits_every_line_once() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..130).map(|i| format!("l{i}")).collect();
    let path = indexed(&dir, &lines, 16 * 1024);

    let reader = Reader::new(&path, None).unwrap();
    let total = reader.num_lines();
    let mut iter = reader.into_range_iter(0, total, ReadMode::Lines, 17).unwrap();

    let mut count = 0usize;
    while let Some(chunk) = iter.next_chunk() {
        match chunk.unwrap() {
            RangeChunk::Lines(ls) => count += ls.len(),
            _ => panic!("expected Lines chunks"),
        }
    }
    assert_eq!(count as u64, total);
}

#[test]
fn range_iterator_can_be_reset_and_redriven() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..40).map(|i| format!("x{i}")).collect();
    let path = indexed(&dir, &lines, 64 * 1024);

    let reader = Reader::new(&path, None).unwrap();
    let max_bytes = reader.max_bytes();
    let mut iter = reader.into_range_iter(0, max_bytes, ReadMode::Bytes, 8).unwrap();

    let first_pass: Vec<u8> = iter
        .by_ref()
        .map(|c| match c.unwrap() {
            RangeChunk::Bytes(b) => b,
            _ => unreachable!(),
        })
        .flatten()
        .collect();

    iter.reset();
    assert_eq!(iter.current, iter.start);

    let second_pass: Vec<u8> = iter
        .map(|c| match c.unwrap() {
            RangeChunk::Bytes(b) => b,
            _ => unreachable!(),
        })
        .flatten()
        .collect();

    assert_eq!(first_pass, second_pass);
}

#[test]
fn open_range_iterator_builds_directly_from_paths() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..90).map(|i| format!("row{i}")).collect();
    let path = indexed(&dir, &lines, 32 * 1024);

    let mut iter = open_range_iterator(&path, None, 0, 90, ReadMode::Lines, 10).unwrap();
    let mut total = 0usize;
    while let Some(chunk) = iter.next_chunk() {
        match chunk.unwrap() {
            RangeChunk::Lines(ls) => total += ls.len(),
            _ => panic!("expected Lines chunks"),
        }
    }
    assert_eq!(total, 90);
}
