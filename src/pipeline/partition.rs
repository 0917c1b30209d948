use crate::error::{Result, TrizipError};
use crate::pipeline::chunk::Chunk;

/// Split `blob` into `n` contiguous chunks of `len / n` bytes each, with the
/// whole remainder appended to the last chunk. Chunk `i` carries index `i`.
///
/// When `n > len`, the leading chunks are empty and the last chunk carries
/// every byte. This layout is part of the carrier format and must not be
/// rebalanced.
pub fn partition(blob: &[u8], n: usize) -> Result<Vec<Chunk>> {
    if n == 0 {
        return Err(TrizipError::InvalidCarrierCount(n));
    }

    let sizes = chunk_sizes(blob.len(), n);
    let mut chunks = Vec::with_capacity(n);
    let mut offset = 0;
    for (index, size) in sizes.into_iter().enumerate() {
        chunks.push(Chunk::new(index, blob[offset..offset + size].to_vec()));
        offset += size;
    }
    debug_assert_eq!(offset, blob.len());
    Ok(chunks)
}

/// Chunk sizes `partition` produces for a blob of `len` bytes
pub fn chunk_sizes(len: usize, n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let base = len / n;
    let mut sizes = vec![base; n];
    sizes[n - 1] += len % n;
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_goes_to_last() {
        let blob: Vec<u8> = (0..10).collect();
        let chunks = partition(&blob, 3).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.payload.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(chunks[2].index, 2);
        assert_eq!(chunks[2].payload, vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_indices_are_positional() {
        let blob = vec![0u8; 100];
        let chunks = partition(&blob, 7).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_zero_carriers_rejected() {
        assert!(matches!(
            partition(b"abc", 0).unwrap_err(),
            TrizipError::InvalidCarrierCount(0)
        ));
    }

    #[test]
    fn test_single_carrier_takes_everything() {
        let chunks = partition(b"whole", 1).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload, b"whole");
    }

    #[test]
    fn test_more_carriers_than_bytes() {
        let chunks = partition(b"abc", 5).unwrap();
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks[..4] {
            assert!(chunk.payload.is_empty());
        }
        assert_eq!(chunks[4].payload, b"abc");
    }

    #[test]
    fn test_even_split() {
        let blob = vec![1u8; 32];
        let sizes: Vec<usize> = partition(&blob, 2)
            .unwrap()
            .iter()
            .map(|c| c.payload.len())
            .collect();
        assert_eq!(sizes, vec![16, 16]);
    }

    #[test]
    fn test_chunk_sizes_sum() {
        for len in [0usize, 1, 15, 32, 1001] {
            for n in 1..10 {
                assert_eq!(chunk_sizes(len, n).iter().sum::<usize>(), len);
            }
        }
    }
}
