use crate::carrier::{load_image, LsbCodec};
use crate::cli::secure::FileRecord;
use crate::config::{HashAlgorithm, PipelineOptions};
use crate::error::{CarrierFailure, Result, TrizipError};
use crate::fingerprint::fingerprint;
use crate::orchestrator::{restore, Carrier};
use crate::output::StagedDir;
use crate::run::{Stage, StageExt};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Options for the restore command
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub key: String,
    /// Size of the original carrier set, when known
    pub expected_count: Option<usize>,
    pub output_base: PathBuf,
    pub pipeline: PipelineOptions,
    pub hash: HashAlgorithm,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            key: String::new(),
            expected_count: None,
            output_base: PathBuf::from("decrypted_output"),
            pipeline: PipelineOptions::default(),
            hash: HashAlgorithm::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub output_dir: PathBuf,
    pub hash: HashAlgorithm,
    pub carriers: Vec<PathBuf>,
    pub files: Vec<FileRecord>,
}

/// Recover the file set hidden in `carriers`, given in any order, into a
/// fresh output directory
pub fn restore_files(carriers: &[PathBuf], options: &RestoreOptions) -> Result<RestoreReport> {
    if options.key.is_empty() {
        return Err(TrizipError::KeyRequired);
    }
    if carriers.is_empty() {
        return Err(TrizipError::InvalidCarrierCount(0));
    }

    let mut images = Vec::with_capacity(carriers.len());
    let mut failures = Vec::new();
    for path in carriers {
        match load_image(path) {
            Ok(image) => images.push(Carrier::new(path.display().to_string(), image)),
            Err(e) => failures.push(CarrierFailure {
                carrier: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
    if !failures.is_empty() {
        return Err(TrizipError::UnreadableCarriers(failures).at_stage(Stage::Extracting));
    }

    let entries = restore(
        &images,
        options.key.as_bytes(),
        &LsbCodec,
        options.expected_count,
        &options.pipeline,
    )?;
    drop(images);

    let staged = StagedDir::new(&options.output_base).at(Stage::Unarchiving)?;
    let mut files = Vec::with_capacity(entries.len());
    for entry in &entries {
        std::fs::write(staged.path().join(&entry.name), &entry.data).at(Stage::Unarchiving)?;
        files.push(FileRecord {
            name: entry.name.clone(),
            bytes: entry.data.len(),
            fingerprint: fingerprint(&entry.data, options.hash),
        });
    }
    drop(entries);

    let output_dir = staged.commit().at(Stage::Unarchiving)?;
    info!(output = %output_dir.display(), files = files.len(), "restored files");
    Ok(RestoreReport {
        output_dir,
        hash: options.hash,
        carriers: carriers.to_vec(),
        files,
    })
}
