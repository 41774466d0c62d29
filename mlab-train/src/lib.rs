//! # mlab-train — training-job result capture and reporting
//!
//! A thin wrapper around a user-supplied training routine: invoke it, take
//! its [`TrainResults`], and report success or failure to a reporting sink —
//! the mlab collector over HTTP ([`HttpSink`]) or a local directory
//! ([`FileSink`]) — then clean up the run's scratch files.
//!
//! The crate is a library called by a wrapping training-job process; it has
//! no CLI and installs no tracing subscriber. One linear flow, one suspension
//! point (the routine itself), no retries.
//!
//! ```no_run
//! use mlab_train::{ReportConfig, TrainParams, TrainResults, train};
//!
//! # async fn example() -> Result<(), mlab_train::TrainError> {
//! let config = ReportConfig::from_env()?;
//! train(
//!     |ctx| async move {
//!         // ... train, writing working files under ctx.scratch_dir ...
//!         Ok(TrainResults::new("models/run-1.bin").with_metric("accuracy", 0.93))
//!     },
//!     "run-1",
//!     config,
//!     TrainParams::new(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod results;
pub mod runner;
pub mod sink;

pub use config::ReportConfig;
pub use error::TrainError;
pub use results::{FileSource, TrainResults};
pub use runner::{RunOutcome, TrainContext, TrainParams, TrainRunner};
pub use sink::{FileSink, HttpSink, ReportPayload, ReportSink, ReportStatus};

use std::future::Future;
use std::sync::Arc;

/// Run a training routine and report its outcome to the mlab collector.
///
/// Builds an [`HttpSink`] from `config` and delegates to [`TrainRunner`],
/// with per-task artifacts rooted in the current working directory.
pub async fn train<F, Fut>(
    main: F,
    result_id: &str,
    config: ReportConfig,
    params: TrainParams,
) -> Result<RunOutcome, TrainError>
where
    F: FnOnce(TrainContext) -> Fut,
    Fut: Future<Output = anyhow::Result<TrainResults>>,
{
    let sink: Arc<dyn ReportSink> = Arc::new(HttpSink::new(config)?);
    TrainRunner::new(sink, std::env::current_dir()?)
        .run(result_id, params, main)
        .await
}
