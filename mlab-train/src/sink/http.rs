//! HTTP transport to the mlab collector.

use crate::config::ReportConfig;
use crate::error::TrainError;
use crate::sink::{PKG_NAME, ReportPayload, ReportSink, ReportStatus};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info};

/// Posts payloads to the collector as multipart/form-data: one text part per
/// scalar field, one file part per attachment, the user token verbatim in the
/// `Authorization` header.
pub struct HttpSink {
    client: reqwest::Client,
    config: ReportConfig,
}

impl HttpSink {
    pub fn new(config: ReportConfig) -> Result<Self, TrainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, status: ReportStatus) -> String {
        match status {
            ReportStatus::Success => self.config.api_url.clone(),
            // Error reports are flagged in the query string so the collector
            // can route them without parsing the body.
            ReportStatus::Error => format!("{}?error=true", self.config.api_url),
        }
    }

    fn build_form(&self, payload: &ReportPayload) -> Result<Form, TrainError> {
        let mut form = Form::new()
            .text("result_id", payload.result_id.clone())
            .text("pkg_name", PKG_NAME);
        if let Some(metrics) = &payload.metrics {
            form = form.text("metrics", metrics.clone());
        }
        if let Some(model) = &payload.pretrained_model {
            form = form.text("pretrained_model", model.clone());
        }
        if let Some(error) = &payload.error {
            form = form.text("error", error.clone());
        }
        for (name, source) in &payload.files {
            let part = Part::bytes(source.resolve()?).file_name(name.clone());
            form = form.part(name.clone(), part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    async fn save(&self, status: ReportStatus, payload: &ReportPayload) -> Result<(), TrainError> {
        let url = self.endpoint(status);
        let form = self.build_form(payload)?;
        debug!(result_id = %payload.result_id, status = status.as_str(), %url, "uploading report");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.user_token.as_str())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TrainError::Report { status: code, body });
        }

        info!(result_id = %payload.result_id, status = status.as_str(), "report uploaded");
        Ok(())
    }
}
