//! Wraparound range arithmetic for the circular storage.
//!
//! Every copy the producer or consumer performs goes through
//! [`wrapping_ranges`], so the split-copy logic lives in exactly one place
//! instead of being duplicated across each operation.

use std::ops::Range;

/// Decompose the logical byte range of `len` bytes starting at `start`
/// into at most two contiguous index ranges over a storage array of
/// `storage_len` bytes.
///
/// The first range begins at `start`; the second, when present, holds the
/// remainder that wraps to the front of storage.
///
/// Callers guarantee `start < storage_len` and `len <= storage_len`.
pub(crate) fn wrapping_ranges(
    start: usize,
    len: usize,
    storage_len: usize,
) -> (Range<usize>, Option<Range<usize>>) {
    debug_assert!(start < storage_len);
    debug_assert!(len <= storage_len);

    let head = (storage_len - start).min(len);
    if head == len {
        (start..start + len, None)
    } else {
        (start..storage_len, Some(0..len - head))
    }
}
