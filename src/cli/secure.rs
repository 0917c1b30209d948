use crate::carrier::{load_image, save_carrier, LsbCodec};
use crate::config::{Compression, HashAlgorithm, PipelineOptions};
use crate::error::{Result, TrizipError};
use crate::fingerprint::{fingerprint, fingerprint_file};
use crate::orchestrator::{secure, Carrier};
use crate::output::StagedDir;
use crate::pipeline::ArchiveEntry;
use crate::run::{Stage, StageExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for the secure command
#[derive(Debug, Clone)]
pub struct SecureOptions {
    pub key: String,
    /// Carriers land in `<output_base>_<n>`
    pub output_base: PathBuf,
    pub pipeline: PipelineOptions,
    pub hash: HashAlgorithm,
}

impl Default for SecureOptions {
    fn default() -> Self {
        Self {
            key: String::new(),
            output_base: PathBuf::from("encrypted_output"),
            pipeline: PipelineOptions::default(),
            hash: HashAlgorithm::default(),
        }
    }
}

/// A file that went into, or came out of, a carrier set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub bytes: usize,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarrierRecord {
    pub cover: PathBuf,
    pub carrier: PathBuf,
    pub index: usize,
    pub payload_bytes: usize,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecureReport {
    pub output_dir: PathBuf,
    pub compression: Compression,
    pub hash: HashAlgorithm,
    pub inputs: Vec<FileRecord>,
    pub carriers: Vec<CarrierRecord>,
}

/// Seal `inputs` and spread them across one PNG carrier per cover.
/// Either every carrier is written to a fresh output directory or nothing is.
pub fn secure_files(
    inputs: &[PathBuf],
    covers: &[PathBuf],
    options: &SecureOptions,
) -> Result<SecureReport> {
    if options.key.is_empty() {
        return Err(TrizipError::KeyRequired);
    }
    if inputs.is_empty() {
        return Err(TrizipError::InvalidInput("no input files given".into()));
    }

    let mut entries = Vec::with_capacity(inputs.len());
    let mut input_records = Vec::with_capacity(inputs.len());
    for path in inputs {
        let name = base_name(path).at(Stage::Archiving)?;
        let data = std::fs::read(path).at(Stage::Archiving)?;
        input_records.push(FileRecord {
            name: name.clone(),
            bytes: data.len(),
            fingerprint: fingerprint(&data, options.hash),
        });
        entries.push(ArchiveEntry::new(name, data));
    }

    let carrier_names = carrier_file_names(covers).at(Stage::Embedding)?;
    let mut cover_images = Vec::with_capacity(covers.len());
    for path in covers {
        let image = load_image(path).map_err(|e| TrizipError::CarrierFailed {
            carrier: path.display().to_string(),
            source: Box::new(e),
        });
        cover_images.push(Carrier::new(
            path.display().to_string(),
            image.at(Stage::Embedding)?,
        ));
    }

    let staged = StagedDir::new(&options.output_base).at(Stage::Embedding)?;
    let carriers = secure(
        &entries,
        &cover_images,
        options.key.as_bytes(),
        &LsbCodec,
        &options.pipeline,
    )?;
    drop(entries);

    let mut staged_records = Vec::with_capacity(carriers.len());
    for (carrier, name) in carriers.iter().zip(&carrier_names) {
        let path = staged.path().join(name);
        save_carrier(&carrier.image, &path).at(Stage::Embedding)?;
        let digest = fingerprint_file(&path, options.hash).at(Stage::Embedding)?;
        staged_records.push((carrier.index, carrier.payload_len, digest));
    }

    let output_dir = staged.commit().at(Stage::Embedding)?;
    let carrier_records = staged_records
        .into_iter()
        .zip(covers.iter().zip(&carrier_names))
        .map(|((index, payload_bytes, fingerprint), (cover, name))| CarrierRecord {
            cover: cover.clone(),
            carrier: output_dir.join(name),
            index,
            payload_bytes,
            fingerprint,
        })
        .collect();

    info!(
        output = %output_dir.display(),
        carriers = covers.len(),
        files = inputs.len(),
        "secured files"
    );
    Ok(SecureReport {
        output_dir,
        compression: options.pipeline.compression,
        hash: options.hash,
        inputs: input_records,
        carriers: carrier_records,
    })
}

pub(crate) fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            TrizipError::InvalidInput(format!("{} has no usable file name", path.display()))
        })
}

/// `<cover stem>.png` for every cover; two covers may not share a stem
fn carrier_file_names(covers: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(covers.len());
    for cover in covers {
        let stem = cover
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                TrizipError::InvalidInput(format!("{} has no usable file name", cover.display()))
            })?;
        let name = format!("{}.png", stem);
        if !seen.insert(name.clone()) {
            return Err(TrizipError::InvalidInput(format!(
                "two covers would both be written as {}",
                name
            )));
        }
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::tests::cover;
    use tempfile::tempdir;

    fn write_cover(dir: &Path, name: &str, size: u32) -> PathBuf {
        let path = dir.join(name);
        cover(size, size).save(&path).unwrap();
        path
    }

    #[test]
    fn test_secure_writes_one_png_per_cover() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("secret.txt");
        std::fs::write(&input, b"Hello, carriers!").unwrap();
        let covers = vec![
            write_cover(dir.path(), "first.png", 40),
            write_cover(dir.path(), "second.bmp", 40),
        ];

        let options = SecureOptions {
            key: "passphrase".into(),
            output_base: dir.path().join("encrypted_output"),
            ..Default::default()
        };
        let report = secure_files(&[input], &covers, &options).unwrap();

        assert_eq!(report.output_dir, dir.path().join("encrypted_output_0"));
        assert_eq!(report.carriers.len(), 2);
        assert_eq!(report.carriers[0].carrier, report.output_dir.join("first.png"));
        assert_eq!(report.carriers[1].carrier, report.output_dir.join("second.png"));
        for (i, record) in report.carriers.iter().enumerate() {
            assert_eq!(record.index, i);
            assert!(record.carrier.exists());
        }
        assert_eq!(report.inputs[0].name, "secret.txt");
        assert_eq!(report.inputs[0].bytes, 16);
    }

    #[test]
    fn test_secure_increments_output_dir() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, b"a").unwrap();
        let covers = vec![write_cover(dir.path(), "c.png", 40)];
        let options = SecureOptions {
            key: "k".into(),
            output_base: dir.path().join("out"),
            ..Default::default()
        };
        let first = secure_files(&[input.clone()], &covers, &options).unwrap();
        let second = secure_files(&[input], &covers, &options).unwrap();
        assert_eq!(first.output_dir, dir.path().join("out_0"));
        assert_eq!(second.output_dir, dir.path().join("out_1"));
    }

    #[test]
    fn test_failed_secure_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("big.bin");
        std::fs::write(&input, b"payload ".repeat(250)).unwrap();
        let covers = vec![
            write_cover(dir.path(), "roomy.png", 200),
            write_cover(dir.path(), "tiny.png", 4),
        ];
        let options = SecureOptions {
            key: "k".into(),
            output_base: dir.path().join("out"),
            ..Default::default()
        };
        let err = secure_files(&[input], &covers, &options).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embedding));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("out") || n.starts_with(".trizip"))
            .collect();
        assert!(leftovers.is_empty(), "unexpected output: {:?}", leftovers);
    }

    #[test]
    fn test_unwritable_output_fails_in_embedding() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, b"a").unwrap();
        let covers = vec![write_cover(dir.path(), "c.png", 40)];
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let options = SecureOptions {
            key: "k".into(),
            output_base: blocker.join("out"),
            ..Default::default()
        };

        let err = secure_files(&[input], &covers, &options).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Embedding));
        assert!(matches!(err.root_cause(), TrizipError::Io(_)));
    }

    #[test]
    fn test_secure_rejects_colliding_cover_stems() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, b"a").unwrap();
        let covers = vec![
            write_cover(dir.path(), "same.png", 40),
            write_cover(dir.path(), "same.bmp", 40),
        ];
        let options = SecureOptions {
            key: "k".into(),
            output_base: dir.path().join("out"),
            ..Default::default()
        };
        let err = secure_files(&[input], &covers, &options).unwrap_err();
        assert!(matches!(err.root_cause(), TrizipError::InvalidInput(_)));
    }

    #[test]
    fn test_secure_requires_key_and_inputs() {
        let options = SecureOptions::default();
        assert!(matches!(
            secure_files(&[PathBuf::from("x")], &[PathBuf::from("y")], &options).unwrap_err(),
            TrizipError::KeyRequired
        ));
        let options = SecureOptions {
            key: "k".into(),
            ..Default::default()
        };
        assert!(matches!(
            secure_files(&[], &[PathBuf::from("y")], &options).unwrap_err(),
            TrizipError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_missing_input_fails_in_archiving() {
        let dir = tempdir().unwrap();
        let options = SecureOptions {
            key: "k".into(),
            output_base: dir.path().join("out"),
            ..Default::default()
        };
        let err = secure_files(
            &[dir.path().join("absent.txt")],
            &[dir.path().join("cover.png")],
            &options,
        )
        .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Archiving));
        assert!(matches!(err.root_cause(), TrizipError::Io(_)));
    }
}
