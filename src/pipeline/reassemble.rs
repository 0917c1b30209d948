use crate::error::{Result, TrizipError};
use crate::pipeline::chunk::Chunk;
use std::collections::{BTreeMap, BTreeSet};
use zeroize::Zeroizing;

/// Most missing indices listed in a [`TrizipError::MissingCarrier`]
pub const MAX_LISTED_MISSING: usize = 16;

/// Rebuild the original byte stream from chunks presented in any order.
///
/// Chunks are keyed by index. A repeated index with an identical payload is
/// tolerated (the same carrier supplied twice); with a different payload it
/// is a [`TrizipError::DuplicateIndex`]. Every index in `0..expected_count`
/// must be present.
pub fn reassemble(chunks: &[Chunk], expected_count: usize) -> Result<Zeroizing<Vec<u8>>> {
    if expected_count == 0 {
        return Err(TrizipError::InvalidCarrierCount(0));
    }

    let mut by_index: BTreeMap<usize, &[u8]> = BTreeMap::new();
    for chunk in chunks {
        if chunk.index >= expected_count {
            return Err(TrizipError::UnexpectedIndex {
                index: chunk.index,
                expected: expected_count,
            });
        }
        match by_index.get(&chunk.index) {
            Some(existing) if *existing != chunk.payload.as_slice() => {
                return Err(TrizipError::DuplicateIndex(chunk.index));
            }
            Some(_) => {}
            None => {
                by_index.insert(chunk.index, &chunk.payload);
            }
        }
    }

    if by_index.len() < expected_count {
        let (missing, missing_count) =
            find_gaps(by_index.keys().copied(), expected_count, MAX_LISTED_MISSING);
        return Err(TrizipError::MissingCarrier {
            expected: expected_count,
            missing,
            missing_count,
        });
    }

    let total = by_index.values().map(|p| p.len()).sum();
    let mut out = Zeroizing::new(Vec::with_capacity(total));
    for payload in by_index.values() {
        out.extend_from_slice(payload);
    }
    Ok(out)
}

/// Carrier count to expect when the caller does not know it: the number of
/// distinct indices revealed, or the highest index plus one if that is
/// larger, so gaps in the middle are still reported. Repeated carriers are
/// counted once.
pub fn infer_expected_count(chunks: &[Chunk]) -> Result<usize> {
    let distinct: BTreeSet<usize> = chunks.iter().map(|c| c.index).collect();
    let Some(&highest) = distinct.last() else {
        return Ok(0);
    };
    let past_highest = highest
        .checked_add(1)
        .ok_or(TrizipError::UnexpectedIndex {
            index: highest,
            expected: distinct.len(),
        })?;
    Ok(past_highest.max(distinct.len()))
}

/// Indices in `0..expected` absent from `present`, which must be sorted and
/// free of repeats. Returns at most `limit` of them plus the total number
/// missing; work is bounded by the length of `present`, not by `expected`.
pub fn find_gaps(
    present: impl IntoIterator<Item = usize>,
    expected: usize,
    limit: usize,
) -> (Vec<usize>, usize) {
    let mut listed = Vec::new();
    let mut count = 0usize;
    let mut next = 0usize;
    for index in present.into_iter().chain(std::iter::once(expected)) {
        let end = index.min(expected);
        if end > next {
            count += end - next;
            let room = limit.saturating_sub(listed.len());
            listed.extend((next..end).take(room));
        }
        if index >= expected {
            break;
        }
        next = index + 1;
    }
    (listed, count)
}
