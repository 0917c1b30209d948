//! Output directories.
//!
//! Results are written into a hidden staging directory next to the final
//! location and only renamed into place once everything has been written.
//! A failed run drops the staging directory and leaves no partial output.

use crate::error::{Result, TrizipError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Create and return the first `<base>_<n>` (n = 0, 1, ...) that did not
/// exist. `create_dir` fails on an existing path, so a directory made by
/// another process in the meantime is skipped, never reused.
pub fn claim_output_dir(base: &Path) -> Result<PathBuf> {
    let mut index = 0usize;
    loop {
        let candidate = numbered(base, index);
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                index = index.checked_add(1).ok_or_else(|| {
                    TrizipError::InvalidInput(format!(
                        "no free output directory for {}",
                        base.display()
                    ))
                })?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn numbered(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}", index));
    PathBuf::from(name)
}

/// Directory being filled for one run
#[derive(Debug)]
pub struct StagedDir {
    staging: TempDir,
    base: PathBuf,
}

impl StagedDir {
    /// Create a staging directory beside where `<base>_<n>` will land
    pub fn new(base: &Path) -> Result<Self> {
        let parent = match base.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if base.file_name().is_none() {
            return Err(TrizipError::InvalidInput(format!(
                "output base {} has no file name",
                base.display()
            )));
        }
        std::fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".trizip-staging-")
            .tempdir_in(&parent)?;
        debug!(staging = %staging.path().display(), "staging directory created");
        Ok(Self {
            staging,
            base: base.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Move the staged contents into a freshly claimed `<base>_<n>` and
    /// return its path. On failure the claimed directory is removed again.
    pub fn commit(self) -> Result<PathBuf> {
        let final_dir = claim_output_dir(&self.base)?;
        if let Err(e) = move_entries(self.staging.path(), &final_dir) {
            let _ = std::fs::remove_dir_all(&final_dir);
            return Err(e);
        }
        debug!(output = %final_dir.display(), "output committed");
        Ok(final_dir)
    }
}

fn move_entries(from: &Path, to: &Path) -> Result<()> {
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        std::fs::rename(entry.path(), to.join(entry.file_name()))?;
    }
    Ok(())
}
