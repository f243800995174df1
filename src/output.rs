use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{PeakError, PeakResult};

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    #[default]
    Refuse,
    Replace,
}

impl OverwritePolicy {
    pub fn from_flag(overwrite: bool) -> Self {
        if overwrite {
            OverwritePolicy::Replace
        } else {
            OverwritePolicy::Refuse
        }
    }

    /// Fail early if `path` exists and may not be replaced.
    pub fn check(self, path: &Path) -> PeakResult<()> {
        if self == OverwritePolicy::Refuse && path.exists() {
            return Err(PeakError::OutputExists {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// A finished output that is still sitting in a temporary file next to its
/// destination. Dropping it without [`commit`](StagedOutput::commit) removes
/// the temporary file.
#[derive(Debug)]
pub struct StagedOutput {
    tmp: NamedTempFile,
    path: PathBuf,
    policy: OverwritePolicy,
}

impl StagedOutput {
    /// Fill a temporary file in the directory of `path` with `write`.
    ///
    /// Readers never see a half written file. On any error the temporary
    /// file is removed.
    pub(crate) fn stage<F>(path: &Path, policy: OverwritePolicy, write: F) -> PeakResult<Self>
    where
        F: FnOnce(&mut NamedTempFile) -> PeakResult<()>,
    {
        policy.check(path)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PeakError::io(path, e))?;
        write(&mut tmp)?;
        Ok(StagedOutput {
            tmp,
            path: path.to_path_buf(),
            policy,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the temporary file into place.
    pub fn commit(self) -> PeakResult<PathBuf> {
        let StagedOutput { tmp, path, policy } = self;
        let persisted = match policy {
            OverwritePolicy::Replace => tmp.persist(&path),
            OverwritePolicy::Refuse => tmp.persist_noclobber(&path),
        };
        match persisted {
            Ok(_) => Ok(path),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(PeakError::OutputExists { path })
            }
            Err(e) => Err(PeakError::io(&path, e.error)),
        }
    }
}

/// Commit every staged output, or none of them.
///
/// If one commit fails, the files already moved into place by this call are
/// removed again and the remaining temporary files are dropped.
pub fn commit_all(staged: Vec<StagedOutput>) -> PeakResult<Vec<PathBuf>> {
    let mut committed = Vec::with_capacity(staged.len());
    for output in staged {
        match output.commit() {
            Ok(path) => committed.push(path),
            Err(e) => {
                for path in &committed {
                    if let Err(cleanup) = std::fs::remove_file(path) {
                        warn!("could not remove {}: {cleanup}", path.display());
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(committed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn refuses_existing_file_and_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.csv");
        std::fs::write(&path, "old").unwrap();

        let err = StagedOutput::stage(&path, OverwritePolicy::Refuse, |f| {
            f.write_all(b"new").map_err(|e| PeakError::io(Path::new("tmp"), e))
        })
        .unwrap_err();
        assert!(matches!(err, PeakError::OutputExists { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");

        StagedOutput::stage(&path, OverwritePolicy::Replace, |f| {
            f.write_all(b"new").map_err(|e| PeakError::io(Path::new("tmp"), e))
        })
        .and_then(StagedOutput::commit)
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.csv");
        let err = StagedOutput::stage(&path, OverwritePolicy::Refuse, |_| {
            Err(PeakError::EmptyInput)
        })
        .unwrap_err();
        assert!(matches!(err, PeakError::EmptyInput));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn stage_text(path: &Path, text: &'static str) -> PeakResult<StagedOutput> {
        StagedOutput::stage(path, OverwritePolicy::Refuse, |f| {
            f.write_all(text.as_bytes()).map_err(|e| PeakError::io(Path::new("tmp"), e))
        })
    }

    #[test]
    fn staged_output_is_invisible_until_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.csv");
        let staged = stage_text(&path, "x,y\n").unwrap();
        assert_eq!(staged.path(), path.as_path());
        assert!(!path.exists());

        assert_eq!(staged.commit().unwrap(), path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x,y\n");

        let dropped = stage_text(&dir.path().join("other.csv"), "x,y\n").unwrap();
        drop(dropped);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn commit_all_rolls_back_when_one_commit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("table.csv");
        let second = dir.path().join("figure.png");
        let staged = vec![
            stage_text(&first, "table").unwrap(),
            stage_text(&second, "figure").unwrap(),
        ];
        // Someone else creates the second destination after staging.
        std::fs::write(&second, "theirs").unwrap();

        let err = commit_all(staged).unwrap_err();
        assert!(matches!(err, PeakError::OutputExists { .. }));
        assert!(!first.exists());
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "theirs");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
