//! In-memory pipeline for both directions.
//!
//! ```text
//! secure:  entries → archive → compress → seal → partition → embed → carriers
//! restore: carriers → reveal → reassemble → unseal → decompress → unarchive → entries
//! ```
//!
//! Stages run strictly one after another through a [`Run`]. Embedding and
//! revealing may fan out across carriers because carriers share nothing.
//! Every intermediate buffer is wiped on drop, so an early return from any
//! stage leaves nothing behind.

use crate::carrier::CarrierCodec;
use crate::config::PipelineOptions;
use crate::error::{CarrierFailure, Result, TrizipError};
use crate::pipeline::{
    compress, decompress, infer_expected_count, pack, partition, reassemble, seal, unpack,
    unseal, ArchiveEntry, Chunk, SealedBlob,
};
use crate::run::{Operation, Run, Stage};
use tracing::{debug, info, warn};

/// An image supplied by the caller, with an identity used in reports and
/// error messages
#[derive(Debug, Clone)]
pub struct Carrier<I> {
    pub id: String,
    pub image: I,
}

impl<I> Carrier<I> {
    pub fn new(id: impl Into<String>, image: I) -> Self {
        Self {
            id: id.into(),
            image,
        }
    }
}

/// A carrier produced by the secure path
#[derive(Debug, Clone)]
pub struct EmbeddedCarrier<I> {
    /// Identity of the cover it was made from
    pub id: String,
    pub index: usize,
    pub payload_len: usize,
    pub image: I,
}

/// Run the secure path: hide `entries` across one carrier per cover.
/// Carrier `i` of the result holds chunk `i` and was made from `covers[i]`.
pub fn secure<C: CarrierCodec>(
    entries: &[ArchiveEntry],
    covers: &[Carrier<C::Image>],
    key: &[u8],
    codec: &C,
    options: &PipelineOptions,
) -> Result<Vec<EmbeddedCarrier<C::Image>>> {
    if key.is_empty() {
        return Err(TrizipError::KeyRequired);
    }

    let mut run = Run::new(Operation::Secure);

    let archive = run.stage(Stage::Archiving, || pack(entries))?;
    debug!(files = entries.len(), bytes = archive.len(), "archive packed");

    let compressed = run.stage(Stage::Compressing, || {
        compress(&archive, options.compression)
    })?;
    drop(archive);
    debug!(bytes = compressed.len(), compression = ?options.compression, "stream compressed");

    let blob = run.stage(Stage::Sealing, || seal(&compressed, key))?;
    drop(compressed);
    debug!(bytes = blob.len(), "stream sealed");

    let chunks = run.stage(Stage::Partitioning, || {
        partition(blob.as_bytes(), covers.len())
    })?;
    drop(blob);

    let carriers = run.stage(Stage::Embedding, || {
        embed_all(codec, covers, &chunks, options.parallel)
    })?;

    run.finish()?;
    info!(
        carriers = carriers.len(),
        bytes = chunks.iter().map(|c| c.payload.len()).sum::<usize>(),
        "carrier set created"
    );
    Ok(carriers)
}

/// Run the restore path over carriers in any order.
///
/// `expected_count` is the size of the original carrier set. When it is not
/// known it is inferred from the distinct indices the carriers reveal, which
/// catches gaps but not a missing final carrier.
pub fn restore<C: CarrierCodec>(
    carriers: &[Carrier<C::Image>],
    key: &[u8],
    codec: &C,
    expected_count: Option<usize>,
    options: &PipelineOptions,
) -> Result<Vec<ArchiveEntry>> {
    if key.is_empty() {
        return Err(TrizipError::KeyRequired);
    }

    let mut run = Run::new(Operation::Restore);

    let chunks = run.stage(Stage::Extracting, || {
        reveal_all(codec, carriers, options.parallel)
    })?;

    let mut joined = run.stage(Stage::Reassembling, || {
        let expected = match expected_count {
            Some(count) => count,
            None => infer_expected_count(&chunks)?,
        };
        debug!(expected, supplied = carriers.len(), "reassembling");
        reassemble(&chunks, expected)
    })?;
    drop(chunks);

    let plain = run.stage(Stage::Unsealing, || {
        let blob = SealedBlob::from_bytes(std::mem::take(&mut *joined))?;
        unseal(&blob, key)
    })?;
    drop(joined);

    let decompressed = run.stage(Stage::Decompressing, || decompress(&plain))?;
    drop(plain);

    let entries = run.stage(Stage::Unarchiving, || unpack(&decompressed))?;

    run.finish()?;
    info!(files = entries.len(), carriers = carriers.len(), "carrier set restored");
    Ok(entries)
}

fn embed_all<C: CarrierCodec>(
    codec: &C,
    covers: &[Carrier<C::Image>],
    chunks: &[Chunk],
    parallel: bool,
) -> Result<Vec<EmbeddedCarrier<C::Image>>> {
    let jobs: Vec<(&Carrier<C::Image>, &Chunk)> = covers.iter().zip(chunks).collect();

    let results = map_items(&jobs, parallel, |(cover, chunk)| {
        debug!(
            carrier = %cover.id,
            index = chunk.index,
            bytes = chunk.payload.len(),
            "embedding chunk"
        );
        codec
            .embed(&cover.image, &chunk.to_transport())
            .map(|image| EmbeddedCarrier {
                id: cover.id.clone(),
                index: chunk.index,
                payload_len: chunk.payload.len(),
                image,
            })
            .map_err(|e| {
                warn!(carrier = %cover.id, error = %e, "embedding failed");
                TrizipError::CarrierFailed {
                    carrier: cover.id.clone(),
                    source: Box::new(e),
                }
            })
    });
    results.into_iter().collect()
}

fn reveal_all<C: CarrierCodec>(
    codec: &C,
    carriers: &[Carrier<C::Image>],
    parallel: bool,
) -> Result<Vec<Chunk>> {
    if carriers.is_empty() {
        return Err(TrizipError::InvalidCarrierCount(0));
    }

    let results = map_items(carriers, parallel, |carrier| {
        let revealed = match codec.reveal(&carrier.image) {
            Ok(Some(text)) => Chunk::from_transport(&text),
            Ok(None) => Err(TrizipError::MalformedChunk("no hidden payload".into())),
            Err(e) => Err(e),
        };
        revealed.map_err(|e| {
            warn!(carrier = %carrier.id, error = %e, "carrier unreadable");
            CarrierFailure {
                carrier: carrier.id.clone(),
                reason: e.to_string(),
            }
        })
    });

    let mut chunks = Vec::with_capacity(carriers.len());
    let mut failures = Vec::new();
    for (carrier, result) in carriers.iter().zip(results) {
        match result {
            Ok(chunk) => {
                debug!(
                    carrier = %carrier.id,
                    index = chunk.index,
                    bytes = chunk.payload.len(),
                    "chunk revealed"
                );
                chunks.push(chunk);
            }
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        return Err(TrizipError::UnreadableCarriers(failures));
    }
    Ok(chunks)
}

/// Apply `f` to every item, on one scoped thread per item when `parallel`.
/// Results come back in input order.
fn map_items<A, T, F>(items: &[A], parallel: bool, f: F) -> Vec<T>
where
    A: Sync,
    T: Send,
    F: Fn(&A) -> T + Sync,
{
    if !parallel || items.len() < 2 {
        return items.iter().map(&f).collect();
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let f = &f;
                scope.spawn(move || f(item))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::tests::cover;
    use crate::carrier::LsbCodec;
    use crate::config::Compression;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &[u8] = b"correct horse battery staple";

    /// Test codec: an image is just the text it carries
    #[derive(Default)]
    struct TextCodec {
        embeds: AtomicUsize,
    }

    impl CarrierCodec for TextCodec {
        type Image = Option<String>;

        fn embed(&self, _cover: &Option<String>, message: &str) -> Result<Option<String>> {
            self.embeds.fetch_add(1, Ordering::SeqCst);
            Ok(Some(message.to_string()))
        }

        fn reveal(&self, carrier: &Option<String>) -> Result<Option<String>> {
            Ok(carrier.clone())
        }
    }

    fn entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::new("report.txt", b"quarterly numbers".to_vec()),
            ArchiveEntry::new("data.bin", (0..3000).map(|i| (i % 97) as u8).collect()),
        ]
    }

    fn blank_covers(n: usize) -> Vec<Carrier<Option<String>>> {
        (0..n).map(|i| Carrier::new(format!("cover{}", i), None)).collect()
    }

    fn as_inputs(carriers: Vec<EmbeddedCarrier<Option<String>>>) -> Vec<Carrier<Option<String>>> {
        carriers
            .into_iter()
            .map(|c| Carrier::new(c.id, c.image))
            .collect()
    }

    #[test]
    fn test_roundtrip_text_codec() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let carriers = secure(&entries(), &blank_covers(3), KEY, &codec, &options).unwrap();
        assert_eq!(carriers.len(), 3);
        assert_eq!(codec.embeds.load(Ordering::SeqCst), 3);
        for (i, c) in carriers.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.id, format!("cover{}", i));
        }

        let restored = restore(&as_inputs(carriers), KEY, &codec, Some(3), &options).unwrap();
        assert_eq!(restored, entries());
    }

    #[test]
    fn test_roundtrip_any_order_and_compression() {
        let codec = TextCodec::default();
        for compression in [
            Compression::Zstd,
            Compression::Lz4,
            Compression::Brotli,
            Compression::None,
        ] {
            for parallel in [false, true] {
                let options = PipelineOptions {
                    compression,
                    parallel,
                };
                let carriers = secure(&entries(), &blank_covers(4), KEY, &codec, &options).unwrap();
                let mut inputs = as_inputs(carriers);
                inputs.reverse();
                inputs.swap(0, 2);
                let restored = restore(&inputs, KEY, &codec, None, &options).unwrap();
                assert_eq!(restored, entries());
            }
        }
    }

    #[test]
    fn test_secure_requires_key() {
        let codec = TextCodec::default();
        let err = secure(&entries(), &blank_covers(2), b"", &codec, &PipelineOptions::default())
            .unwrap_err();
        assert!(matches!(err, TrizipError::KeyRequired));
        assert_eq!(codec.embeds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_secure_without_covers_fails_in_partitioning() {
        let codec = TextCodec::default();
        let err = secure(&entries(), &[], KEY, &codec, &PipelineOptions::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Partitioning));
        assert!(matches!(err.root_cause(), TrizipError::InvalidCarrierCount(0)));
    }

    #[test]
    fn test_duplicate_names_fail_in_archiving() {
        let codec = TextCodec::default();
        let dup = vec![
            ArchiveEntry::new("same", vec![1]),
            ArchiveEntry::new("same", vec![2]),
        ];
        let err = secure(&dup, &blank_covers(2), KEY, &codec, &PipelineOptions::default())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Archiving));
        assert_eq!(codec.embeds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_carrier_with_known_count() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let mut inputs = as_inputs(secure(&entries(), &blank_covers(3), KEY, &codec, &options).unwrap());
        inputs.remove(0);
        let err = restore(&inputs, KEY, &codec, Some(3), &options).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Reassembling));
        match err.root_cause() {
            TrizipError::MissingCarrier {
                expected, missing, ..
            } => {
                assert_eq!(*expected, 3);
                assert_eq!(missing, &vec![0]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_repeated_carrier_restores_without_count() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let mut inputs = as_inputs(secure(&entries(), &blank_covers(2), KEY, &codec, &options).unwrap());
        inputs.push(inputs[0].clone());
        let restored = restore(&inputs, KEY, &codec, None, &options).unwrap();
        assert_eq!(restored, entries());
    }

    #[test]
    fn test_oversized_index_is_rejected_without_panic() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let mut inputs = as_inputs(secure(&entries(), &blank_covers(2), KEY, &codec, &options).unwrap());
        inputs[1].image = Some(format!("{}:00", usize::MAX));
        let err = restore(&inputs, KEY, &codec, None, &options).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Reassembling));
        assert!(matches!(
            err.root_cause(),
            TrizipError::UnexpectedIndex { index: usize::MAX, .. }
        ));
    }

    #[test]
    fn test_unreadable_carriers_are_aggregated() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let mut inputs = as_inputs(secure(&entries(), &blank_covers(4), KEY, &codec, &options).unwrap());
        inputs[1].image = None;
        inputs[3].image = Some("nonsense".into());

        let err = restore(&inputs, KEY, &codec, None, &options).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Extracting));
        match err.root_cause() {
            TrizipError::UnreadableCarriers(failures) => {
                let ids: Vec<&str> = failures.iter().map(|f| f.carrier.as_str()).collect();
                assert_eq!(ids, vec!["cover1", "cover3"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_key_fails_after_reassembly() {
        let codec = TextCodec::default();
        let options = PipelineOptions::default();
        let inputs = as_inputs(secure(&entries(), &blank_covers(2), KEY, &codec, &options).unwrap());
        let err = restore(&inputs, b"not the key", &codec, None, &options).unwrap_err();
        assert!(matches!(
            err.stage(),
            Some(Stage::Unsealing) | Some(Stage::Decompressing) | Some(Stage::Unarchiving)
        ));
        assert!(matches!(err.root_cause(), TrizipError::IntegrityError(_)));
    }

    #[test]
    fn test_restore_with_no_carriers() {
        let codec = TextCodec::default();
        let err = restore::<TextCodec>(&[], KEY, &codec, None, &PipelineOptions::default())
            .unwrap_err();
        assert!(matches!(err.root_cause(), TrizipError::InvalidCarrierCount(0)));
    }

    #[test]
    fn test_embedding_failure_names_carrier() {
        let options = PipelineOptions::default();
        let covers = vec![
            Carrier::new("big.png", cover(64, 64)),
            Carrier::new("tiny.png", cover(2, 2)),
        ];
        let err = secure(&entries(), &covers, KEY, &LsbCodec, &options).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embedding));
        match &err {
            TrizipError::Stage { source, .. } => match source.as_ref() {
                TrizipError::CarrierFailed { carrier, .. } => assert_eq!(carrier, "tiny.png"),
                other => panic!("unexpected error {:?}", other),
            },
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            err.root_cause(),
            TrizipError::CarrierTooSmall { .. }
        ));
    }

    #[test]
    fn test_lsb_codec_end_to_end() {
        let options = PipelineOptions::default();
        let covers: Vec<_> = (0..3)
            .map(|i| Carrier::new(format!("c{}", i), cover(48, 48)))
            .collect();
        let carriers = secure(&entries(), &covers, KEY, &LsbCodec, &options).unwrap();
        let mut inputs: Vec<_> = carriers
            .into_iter()
            .map(|c| Carrier::new(c.id, c.image))
            .collect();
        inputs.rotate_left(1);
        let restored = restore(&inputs, KEY, &LsbCodec, Some(3), &options).unwrap();
        assert_eq!(restored, entries());
    }

    #[test]
    fn test_map_items_preserves_order() {
        let items: Vec<usize> = (0..16).collect();
        let out = map_items(&items, true, |i| i * 2);
        assert_eq!(out, (0..16).map(|i| i * 2).collect::<Vec<_>>());
    }
}
