//! Training runner — invoke the user routine, report the outcome, clean up.

use crate::artifacts::{self, ERROR_LOG, TaskWorkspace};
use crate::error::TrainError;
use crate::results::{FileSource, TrainResults};
use crate::sink::{ReportPayload, ReportSink, ReportStatus};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Arbitrary JSON parameters forwarded to the training routine.
pub type TrainParams = serde_json::Map<String, serde_json::Value>;

/// What the training routine is handed when invoked.
#[derive(Debug, Clone)]
pub struct TrainContext {
    /// Identifier correlating this run with its reported outcome.
    pub result_id: String,
    /// Scratch directory for working files, removed after the run.
    pub scratch_dir: PathBuf,
    /// Caller-supplied parameters (dataset paths, hyperparameters, …).
    pub params: TrainParams,
}

impl TrainContext {
    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }
}

/// How a run ended. `Failed` means the failure was reported to the sink; the
/// runner only returns `Err` when the error report itself could not be
/// delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { error: String },
}

/// Runs one training routine and reports exactly one success or error payload
/// to the sink, then removes the run's scratch directory.
pub struct TrainRunner {
    sink: Arc<dyn ReportSink>,
    workspace: TaskWorkspace,
}

impl TrainRunner {
    pub fn new(sink: Arc<dyn ReportSink>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            sink,
            workspace: TaskWorkspace::new(workspace_root),
        }
    }

    /// Invoke `main` for `result_id` and report its outcome.
    ///
    /// Any failure on the success path — the routine itself, metric
    /// serialization, or the success upload — is appended to the task's
    /// `error.txt` and reported once under the error status. No retries.
    pub async fn run<F, Fut>(
        &self,
        result_id: &str,
        params: TrainParams,
        main: F,
    ) -> Result<RunOutcome, TrainError>
    where
        F: FnOnce(TrainContext) -> Fut,
        Fut: Future<Output = anyhow::Result<TrainResults>>,
    {
        let attempt = self.attempt(result_id, params, main).await;
        let outcome = match attempt {
            Ok(uploaded) => {
                artifacts::remove_uploaded_files(uploaded.iter().map(PathBuf::as_path));
                info!(result_id, "training run completed");
                Ok(RunOutcome::Completed)
            }
            Err(message) => self
                .report_failure(result_id, &message)
                .await
                .map(|()| RunOutcome::Failed { error: message }),
        };

        // Runs regardless of which branch was taken. A cleanup failure must
        // not mask the run's outcome.
        if let Err(e) = self.workspace.remove_scratch(result_id) {
            warn!(result_id, error = %e, "scratch cleanup failed");
        }
        outcome
    }

    /// The success path. Returns the uploaded path-backed files so the caller
    /// can delete them, or the failure text for the error branch.
    async fn attempt<F, Fut>(
        &self,
        result_id: &str,
        params: TrainParams,
        main: F,
    ) -> Result<Vec<PathBuf>, String>
    where
        F: FnOnce(TrainContext) -> Fut,
        Fut: Future<Output = anyhow::Result<TrainResults>>,
    {
        let scratch_dir = self
            .workspace
            .create_scratch(result_id)
            .map_err(|e| e.to_string())?;
        let ctx = TrainContext {
            result_id: result_id.to_string(),
            scratch_dir,
            params,
        };

        let results = main(ctx).await.map_err(|e| format!("{e:#}"))?;
        self.report_success(result_id, &results)
            .await
            .map_err(|e| e.to_string())?;

        Ok(results
            .files
            .values()
            .filter_map(|source| source.path().cloned())
            .collect())
    }

    async fn report_success(
        &self,
        result_id: &str,
        results: &TrainResults,
    ) -> Result<(), TrainError> {
        let metrics = serde_json::to_string(&results.metrics)?;
        let payload = ReportPayload::success(
            result_id,
            metrics,
            results.pretrained_model.as_str(),
            results.files.clone(),
        );
        self.sink.save(ReportStatus::Success, &payload).await
    }

    async fn report_failure(&self, result_id: &str, message: &str) -> Result<(), TrainError> {
        error!(result_id, error = message, "training run failed");
        let log = self.workspace.append_error(result_id, message)?;
        let mut files = BTreeMap::new();
        files.insert(ERROR_LOG.to_string(), FileSource::Bytes(log));
        let payload = ReportPayload::error(result_id, message, files);
        self.sink.save(ReportStatus::Error, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every save call; optionally rejects success uploads.
    struct RecordingSink {
        saves: Mutex<Vec<(ReportStatus, ReportPayload)>>,
        fail_success: bool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                saves: Mutex::new(Vec::new()),
                fail_success: false,
            })
        }

        fn rejecting_success() -> Arc<Self> {
            Arc::new(Self {
                saves: Mutex::new(Vec::new()),
                fail_success: true,
            })
        }

        fn saves(&self) -> Vec<(ReportStatus, ReportPayload)> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ReportSink for RecordingSink {
        async fn save(
            &self,
            status: ReportStatus,
            payload: &ReportPayload,
        ) -> Result<(), TrainError> {
            self.saves.lock().unwrap().push((status, payload.clone()));
            if self.fail_success && status == ReportStatus::Success {
                return Err(TrainError::sink("collector rejected the upload"));
            }
            Ok(())
        }
    }

    fn runner(sink: Arc<RecordingSink>, root: &std::path::Path) -> TrainRunner {
        TrainRunner::new(sink as Arc<dyn ReportSink>, root)
    }

    #[tokio::test]
    async fn test_success_reports_once_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let runner = runner(sink.clone(), dir.path());

        let model_file = dir.path().join("model.bin");
        std::fs::write(&model_file, b"weights").unwrap();
        let model_file_cb = model_file.clone();

        let outcome = runner
            .run("run-1", TrainParams::new(), |_ctx| async move {
                Ok(TrainResults::new("models/run-1.bin")
                    .with_metric("accuracy", 0.93)
                    .with_file_path("model.bin", model_file_cb))
            })
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        let saves = sink.saves();
        assert_eq!(saves.len(), 1);
        let (status, payload) = &saves[0];
        assert_eq!(*status, ReportStatus::Success);
        assert_eq!(payload.pretrained_model.as_deref(), Some("models/run-1.bin"));
        assert_eq!(payload.metrics.as_deref(), Some(r#"{"accuracy":0.93}"#));
        // Uploaded path-backed files are deleted, scratch is removed.
        assert!(!model_file.exists());
        assert!(!dir.path().join("run-1").join("scratch").exists());
        assert!(!dir.path().join("run-1").join(ERROR_LOG).exists());
    }

    #[tokio::test]
    async fn test_failure_reports_error_with_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let runner = runner(sink.clone(), dir.path());

        let outcome = runner
            .run("run-2", TrainParams::new(), |_ctx| async {
                Err(anyhow!("dataset missing"))
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Failed {
                error: "dataset missing".to_string()
            }
        );
        let saves = sink.saves();
        assert_eq!(saves.len(), 1);
        let (status, payload) = &saves[0];
        assert_eq!(*status, ReportStatus::Error);
        assert_eq!(payload.error.as_deref(), Some("dataset missing"));
        match &payload.files[ERROR_LOG] {
            FileSource::Bytes(bytes) => assert_eq!(bytes, b"dataset missing\n"),
            other => panic!("expected bytes attachment, got {other:?}"),
        }
        // The artifact persists on disk, scratch does not.
        assert!(dir.path().join("run-2").join(ERROR_LOG).exists());
        assert!(!dir.path().join("run-2").join("scratch").exists());
    }

    #[tokio::test]
    async fn test_repeated_failures_append_to_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let runner = runner(sink.clone(), dir.path());

        for _ in 0..2 {
            runner
                .run("run-3", TrainParams::new(), |_ctx| async {
                    Err(anyhow!("oom"))
                })
                .await
                .unwrap();
        }

        let saves = sink.saves();
        assert_eq!(saves.len(), 2);
        match &saves[1].1.files[ERROR_LOG] {
            FileSource::Bytes(bytes) => assert_eq!(bytes, b"oom\noom\n"),
            other => panic!("expected bytes attachment, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_upload_failure_reroutes_to_error_branch() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::rejecting_success();
        let runner = runner(sink.clone(), dir.path());

        let outcome = runner
            .run("run-4", TrainParams::new(), |_ctx| async {
                Ok(TrainResults::new("models/run-4.bin"))
            })
            .await
            .unwrap();

        let error = match outcome {
            RunOutcome::Failed { error } => error,
            other => panic!("expected failed outcome, got {other:?}"),
        };
        assert!(error.contains("collector rejected the upload"));

        let saves = sink.saves();
        let errors: Vec<_> = saves
            .iter()
            .filter(|(status, _)| *status == ReportStatus::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(dir.path().join("run-4").join(ERROR_LOG).exists());
    }

    #[tokio::test]
    async fn test_context_carries_params_and_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let runner = runner(sink.clone(), dir.path());

        let mut params = TrainParams::new();
        params.insert("epochs".to_string(), json!(5));

        let outcome = runner
            .run("run-5", params, |ctx| async move {
                assert_eq!(ctx.result_id, "run-5");
                assert_eq!(ctx.param("epochs"), Some(&json!(5)));
                // Scratch is usable during the run.
                std::fs::write(ctx.scratch_dir.join("tmp.bin"), b"x")?;
                Ok(TrainResults::new("models/run-5.bin"))
            })
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert!(!dir.path().join("run-5").join("scratch").exists());
    }
}
