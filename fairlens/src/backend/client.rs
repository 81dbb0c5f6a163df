use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::types::{AnalysisResult, FairnessCheckEnvelope, UploadReceipt};
use crate::backend::BackendConfig;
use crate::catalog::FairnessSelection;
use crate::error::{FairlensError, Result};
use crate::intake::DatasetUpload;
use crate::logging::LogConfig;

/// Parameters of one fairness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairnessRequest {
    /// Name returned by the upload endpoint
    pub filename: String,
    pub protected_attr: String,
    pub selection: FairnessSelection,
    /// Overrides [`BackendConfig::label_col`]
    pub label_col: Option<String>,
    /// Overrides [`BackendConfig::tool`]
    pub tool: Option<String>,
}

impl FairnessRequest {
    /// Creates a request using the configured label column and tool.
    pub fn new(
        filename: impl Into<String>,
        protected_attr: impl Into<String>,
        selection: FairnessSelection,
    ) -> Self {
        Self {
            filename: filename.into(),
            protected_attr: protected_attr.into(),
            selection,
            label_col: None,
            tool: None,
        }
    }

    /// Sets the label column.
    pub fn with_label_col(mut self, label_col: impl Into<String>) -> Self {
        self.label_col = Some(label_col.into());
        self
    }

    /// Sets the analysis tool.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }
}

#[derive(Serialize)]
struct FairnessForm<'a> {
    filename: &'a str,
    protected_attr: &'a str,
    fairness_dimension: &'a str,
    fairness_metrics: String,
    label_col: &'a str,
    tool: &'a str,
}

/// HTTP client for the fairness analysis backend.
#[derive(Clone)]
pub struct BackendClient {
    config: Arc<BackendConfig>,
    client: Client,
    log: LogConfig,
}

impl BackendClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::Configuration`] for an invalid endpoint or
    /// when the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                FairlensError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config: Arc::new(config),
            client,
            log: LogConfig::default(),
        })
    }

    /// Sets how much of the backend traffic is logged.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Sends a dataset to `POST /upload` as multipart field `file`.
    ///
    /// # Errors
    ///
    /// [`FairlensError::Network`] when the backend is unreachable,
    /// [`FairlensError::Upload`] for non-2xx responses, bodies that are not
    /// JSON, and bodies reporting `"status": "error"`.
    #[instrument(skip(self, upload), fields(file = %upload.file_name, bytes = upload.bytes.len()))]
    pub async fn upload(&self, upload: &DatasetUpload) -> Result<UploadReceipt> {
        let url = self.config.url("/upload");

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| {
                FairlensError::Configuration(format!(
                    "Invalid MIME type '{}': {e}",
                    upload.mime_type
                ))
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FairlensError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FairlensError::network(e.to_string()))?;
        self.log_body("upload", status.as_u16(), &body);

        if !status.is_success() {
            return Err(FairlensError::upload(
                Some(status.as_u16()),
                error_body_message(status, &body),
            ));
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            FairlensError::upload(None, format!("Backend returned invalid JSON: {e}"))
        })?;
        let receipt = UploadReceipt::from_value(value)?;
        info!(
            filename = receipt.filename().unwrap_or(&upload.file_name),
            columns = receipt.columns().len(),
            "Dataset uploaded"
        );
        Ok(receipt)
    }

    /// Requests an analysis from `POST /fairness-check`.
    ///
    /// The body is read whatever the HTTP status, since the backend reports
    /// failures inside the JSON envelope.
    ///
    /// # Errors
    ///
    /// [`FairlensError::Network`] when the backend is unreachable or the body
    /// is not JSON, [`FairlensError::AnalysisFailed`] when the envelope
    /// reports a failure or its metrics do not validate.
    #[instrument(skip(self, request), fields(
        filename = %request.filename,
        protected_attr = %request.protected_attr,
        dimension = %request.selection.dimension,
    ))]
    pub async fn fairness_check(&self, request: &FairnessRequest) -> Result<AnalysisResult> {
        let url = self.config.url("/fairness-check");
        let form = FairnessForm {
            filename: &request.filename,
            protected_attr: &request.protected_attr,
            fairness_dimension: request.selection.dimension.as_str(),
            fairness_metrics: request.selection.metrics_param(),
            label_col: request.label_col.as_deref().unwrap_or(self.config.label_col()),
            tool: request.tool.as_deref().unwrap_or(self.config.tool()),
        };
        debug!(metrics = %form.fairness_metrics, tool = form.tool, "Sending fairness check");

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| FairlensError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FairlensError::network(e.to_string()))?;
        self.log_body("fairness-check", status.as_u16(), &body);

        let envelope: FairnessCheckEnvelope = serde_json::from_str(&body).map_err(|e| {
            FairlensError::network(format!(
                "fairness-check returned HTTP {} with an unreadable body ({e})",
                status.as_u16()
            ))
        })?;

        match envelope.into_result() {
            Ok(result) => {
                info!(
                    overall_fairness = result.dashboard_metrics.overall_fairness.percentage,
                    issues = result.detailed_analysis.issues.len(),
                    "Fairness analysis completed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(http_status = status.as_u16(), error = %e, "Fairness analysis failed");
                Err(e)
            }
        }
    }

    fn log_body(&self, endpoint: &str, status: u16, body: &str) {
        if self.log.log_backend_bodies {
            debug!(endpoint, status, body = %self.log.truncate(body), "Backend response");
        }
    }
}

fn error_body_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str().map(str::to_string))
        });
    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => format!("HTTP {status}: {}", crate::logging::truncate_field(body.trim(), 200)),
    }
}
