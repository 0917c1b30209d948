use crate::config::HashAlgorithm;
use crate::error::Result;
use crate::fingerprint::fingerprint_file;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStatus {
    Match,
    Differs,
    OnlyLeft,
    OnlyRight,
}

/// Outcome for one file stem present in either directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub stem: String,
    pub status: CompareStatus,
}

/// Pair the regular files of two directories by file stem and compare
/// their digests. Extensions are ignored, so `cat.jpg` is checked against
/// the `cat.png` carrier or restored file of the same name.
pub fn compare_dirs(
    left: &Path,
    right: &Path,
    algorithm: HashAlgorithm,
) -> Result<Vec<Comparison>> {
    let left_files = files_by_stem(left)?;
    let mut right_files = files_by_stem(right)?;

    let mut results = Vec::new();
    for (stem, left_path) in left_files {
        let status = match right_files.remove(&stem) {
            Some(right_path) => {
                let left_digest = fingerprint_file(&left_path, algorithm)?;
                if left_digest == fingerprint_file(&right_path, algorithm)? {
                    CompareStatus::Match
                } else {
                    CompareStatus::Differs
                }
            }
            None => CompareStatus::OnlyLeft,
        };
        results.push(Comparison { stem, status });
    }
    results.extend(right_files.into_keys().map(|stem| Comparison {
        stem,
        status: CompareStatus::OnlyRight,
    }));
    results.sort_by(|a, b| a.stem.cmp(&b.stem));
    Ok(results)
}

fn files_by_stem(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) {
            files.insert(stem, path);
        }
    }
    Ok(files)
}

/// Plain-text table of comparison results
pub fn format_comparisons(results: &[Comparison]) -> String {
    let mut output = String::new();
    for result in results {
        let label = match result.status {
            CompareStatus::Match => "match",
            CompareStatus::Differs => "DIFFERS",
            CompareStatus::OnlyLeft => "only in left",
            CompareStatus::OnlyRight => "only in right",
        };
        output.push_str(&format!("{:<14} {}\n", label, result.stem));
    }
    let matched = results
        .iter()
        .filter(|r| r.status == CompareStatus::Match)
        .count();
    output.push_str(&format!("\n{} of {} matched\n", matched, results.len()));
    output
}
