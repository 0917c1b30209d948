pub mod archive;
pub mod chunk;
pub mod compress;
pub mod partition;
pub mod reassemble;
pub mod seal;

pub use archive::*;
pub use chunk::*;
pub use compress::*;
pub use partition::*;
pub use reassemble::*;
pub use seal::*;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn partition_then_reassemble_is_identity(
            blob in proptest::collection::vec(any::<u8>(), 1..2048),
            n in 1usize..40,
        ) {
            let chunks = partition(&blob, n).unwrap();
            prop_assert_eq!(chunks.len(), n);
            let reassembled = reassemble(&chunks, n).unwrap();
            prop_assert_eq!(reassembled.as_slice(), &blob[..]);
        }

        #[test]
        fn reassembly_ignores_presentation_order(
            blob in proptest::collection::vec(any::<u8>(), 1..1024),
            n in 1usize..16,
            seed in any::<u64>(),
        ) {
            use rand::seq::SliceRandom;
            use rand::SeedableRng;

            let mut chunks = partition(&blob, n).unwrap();
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            chunks.shuffle(&mut rng);
            let reassembled = reassemble(&chunks, n).unwrap();
            prop_assert_eq!(reassembled.as_slice(), &blob[..]);
        }

        #[test]
        fn transport_roundtrip_preserves_chunk(
            index in any::<usize>(),
            payload in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let chunk = Chunk::new(index, payload);
            let text = chunk.to_transport();
            prop_assert!(text.bytes().all(|b| b.is_ascii_digit() || b == b':' || matches!(b, b'a'..=b'f')));
            prop_assert_eq!(Chunk::from_transport(&text).unwrap(), chunk);
        }

        #[test]
        fn seal_then_unseal_is_identity(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            key in proptest::collection::vec(any::<u8>(), 32),
        ) {
            let blob = seal(&plaintext, &key).unwrap();
            prop_assert_eq!(blob.ciphertext().len() % 16, 0);
            let unsealed = unseal(&blob, &key).unwrap();
            prop_assert_eq!(unsealed.as_slice(), &plaintext[..]);
        }
    }
}
