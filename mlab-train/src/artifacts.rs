//! Per-task directory layout and the error-log artifact.
//!
//! Each training run owns `<root>/<result_id>/` containing a `scratch/`
//! directory for the callback's working files and an `error.txt` artifact that
//! accumulates failure messages. The scratch directory is removed after every
//! run; `error.txt` is kept so repeated failures for the same task append to
//! the same log.

use crate::error::TrainError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub(crate) const ERROR_LOG: &str = "error.txt";

/// Filesystem layout for per-task artifacts.
#[derive(Debug, Clone)]
pub struct TaskWorkspace {
    root: PathBuf,
}

impl TaskWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory owned by one task.
    pub fn task_dir(&self, result_id: &str) -> PathBuf {
        self.root.join(result_id)
    }

    /// Scratch directory handed to the callback, removed after every run.
    pub fn scratch_dir(&self, result_id: &str) -> PathBuf {
        self.task_dir(result_id).join("scratch")
    }

    /// Path of the task's error log.
    pub fn error_log(&self, result_id: &str) -> PathBuf {
        self.task_dir(result_id).join(ERROR_LOG)
    }

    /// Create the scratch directory (and parents) for a run.
    pub fn create_scratch(&self, result_id: &str) -> Result<PathBuf, TrainError> {
        let dir = self.scratch_dir(result_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Append a failure message to the task's error log, creating the task
    /// directory on the first failure, and return the full log contents.
    pub fn append_error(&self, result_id: &str, message: &str) -> Result<Vec<u8>, TrainError> {
        let log = self.error_log(result_id);
        std::fs::create_dir_all(self.task_dir(result_id))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&log)?;
        file.write_all(message.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(std::fs::read(&log)?)
    }

    /// Remove the scratch directory. Missing is fine; a run that never wrote
    /// scratch files has nothing to clean.
    pub fn remove_scratch(&self, result_id: &str) -> Result<(), TrainError> {
        let dir = self.scratch_dir(result_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Delete uploaded output files from disk. Files that are already gone are
/// skipped with a warning rather than failing the run.
pub fn remove_uploaded_files<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove uploaded file");
            }
        }
    }
}
