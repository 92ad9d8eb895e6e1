//! Range locator: binary search over the ordered checkpoint sequence,
//! in both uncompressed-byte and line-number coordinates.

use super::format::Record;

/// Greatest checkpoint index with `uc_offset <= target`, or `None` if
/// `target == 0` (callers must prime from the stream start, not
/// synthesize a fake checkpoint for offset zero — this asymmetry is
/// intentional, not an oversight).
pub(crate) fn find_checkpoint(records: &[Record], target: u64) -> Option<usize> {
    if target == 0 || records.is_empty() {
        return None;
    }
    // partition_point finds the first index where uc_offset > target;
    // the checkpoint just before it is the greatest one <= target.
    let idx = records.partition_point(|r| r.uc_offset <= target);
    Some(idx.saturating_sub(1))
}

/// Contiguous range `[lo, hi)` of checkpoint indices whose
/// `[num_lines, next.num_lines)` interval intersects `[l0, l1]`.
/// `num_lines` only ever increases along the sequence, so both ends are
/// found the same way `find_checkpoint` finds a byte offset: the
/// greatest checkpoint whose `num_lines <= target`.
pub(crate) fn find_checkpoints_by_line_range(
    records: &[Record],
    l0: u64,
    l1: u64,
) -> (usize, usize) {
    if records.is_empty() {
        return (0, 0);
    }
    let lo = records
        .partition_point(|r| r.num_lines <= l0)
        .saturating_sub(1);
    let hi = records
        .partition_point(|r| r.num_lines <= l1)
        .saturating_sub(1);
    (lo, (hi + 1).min(records.len()))
}
