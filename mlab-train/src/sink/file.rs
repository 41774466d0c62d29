//! Local save helper — the non-HTTP reporting variant.

use crate::error::TrainError;
use crate::sink::{PKG_NAME, ReportPayload, ReportSink, ReportStatus};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Saves payloads under a local directory instead of posting them: the scalar
/// fields as `<dir>/<result_id>/<status>.json`, attachments under
/// `<dir>/<result_id>/files/`. Used when there is no collector to talk to.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportSink for FileSink {
    async fn save(&self, status: ReportStatus, payload: &ReportPayload) -> Result<(), TrainError> {
        let task_dir = self.dir.join(&payload.result_id);
        let files_dir = task_dir.join("files");
        std::fs::create_dir_all(&files_dir)?;

        let body = json!({
            "result_id": payload.result_id,
            "pkg_name": PKG_NAME,
            "metrics": payload.metrics,
            "pretrained_model": payload.pretrained_model,
            "error": payload.error,
            "files": payload.files.keys().collect::<Vec<_>>(),
        });
        let report = task_dir.join(format!("{}.json", status.as_str()));
        std::fs::write(&report, serde_json::to_vec_pretty(&body)?)?;

        for (name, source) in &payload.files {
            std::fs::write(files_dir.join(name), source.resolve()?)?;
        }

        info!(result_id = %payload.result_id, status = status.as_str(), path = %report.display(), "report saved");
        Ok(())
    }
}
