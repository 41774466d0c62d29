//! Reporting sinks — where result payloads go.
//!
//! The runner hands exactly one payload per run to a [`ReportSink`], tagged
//! success or error. [`HttpSink`] posts to the mlab collector; [`FileSink`]
//! saves to a local directory for offline or test setups.

pub mod file;
pub mod http;

pub use file::FileSink;
pub use http::HttpSink;

use crate::error::TrainError;
use crate::results::FileSource;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Client-library identifier sent with every report so the collector can tell
/// which uploader produced it.
pub const PKG_NAME: &str = "mlab.train";

/// Outcome tag attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Success,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One report: the scalar fields plus file attachments.
#[derive(Debug, Clone, Default)]
pub struct ReportPayload {
    pub result_id: String,
    /// Metric map serialized to a JSON string; success reports only.
    pub metrics: Option<String>,
    /// Model artifact reference; success reports only.
    pub pretrained_model: Option<String>,
    /// Failure text; error reports only.
    pub error: Option<String>,
    pub files: BTreeMap<String, FileSource>,
}

impl ReportPayload {
    pub fn success(
        result_id: impl Into<String>,
        metrics: String,
        pretrained_model: impl Into<String>,
        files: BTreeMap<String, FileSource>,
    ) -> Self {
        Self {
            result_id: result_id.into(),
            metrics: Some(metrics),
            pretrained_model: Some(pretrained_model.into()),
            error: None,
            files,
        }
    }

    pub fn error(
        result_id: impl Into<String>,
        message: impl Into<String>,
        files: BTreeMap<String, FileSource>,
    ) -> Self {
        Self {
            result_id: result_id.into(),
            metrics: None,
            pretrained_model: None,
            error: Some(message.into()),
            files,
        }
    }
}

/// Destination for exactly one success or error report per run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save(&self, status: ReportStatus, payload: &ReportPayload) -> Result<(), TrainError>;
}
