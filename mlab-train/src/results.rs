//! The training-result record produced by the user's routine.

use crate::error::TrainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Content source for one output file attached to a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// A filesystem path, read at upload time. Must be readable then.
    Path(PathBuf),
}

impl FileSource {
    /// Materialize the content for upload.
    pub fn resolve(&self) -> Result<Vec<u8>, TrainError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Path(path) => Ok(std::fs::read(path)?),
        }
    }

    /// The backing path, when there is one to clean up after upload.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Bytes(_) => None,
            Self::Path(path) => Some(path),
        }
    }
}

/// Results of one training run. Created by the user callback, consumed once
/// by the runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainResults {
    /// Opaque reference to the produced model artifact.
    pub pretrained_model: String,
    /// Metric name to value.
    pub metrics: HashMap<String, f64>,
    /// Output filename to content source, uploaded alongside the metrics.
    pub files: BTreeMap<String, FileSource>,
}

impl TrainResults {
    pub fn new(pretrained_model: impl Into<String>) -> Self {
        Self {
            pretrained_model: pretrained_model.into(),
            metrics: HashMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_file_bytes(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(name.into(), FileSource::Bytes(bytes));
        self
    }

    pub fn with_file_path(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.into(), FileSource::Path(path.into()));
        self
    }
}
