use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{FairlensError, Result};

pub(crate) const ANALYSIS_FAILED_MESSAGE: &str =
    "Fairness analysis failed. Please check backend logs.";
pub(crate) const MISSING_METRICS_MESSAGE: &str =
    "Analysis completed, but dashboard metrics are missing from backend response.";

/// Successful `/upload` response, kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadReceipt {
    raw: Value,
}

impl UploadReceipt {
    /// Checks the body of a 2xx `/upload` response.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::Upload`] when the body reports `"status": "error"`.
    pub fn from_value(raw: Value) -> Result<Self> {
        if raw.get("status").and_then(Value::as_str) == Some("error") {
            let message = raw
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Upload failed");
            return Err(FairlensError::upload(None, message));
        }
        Ok(Self { raw })
    }

    /// The JSON body as returned by the backend.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Name under which the backend stored the dataset.
    pub fn filename(&self) -> Option<&str> {
        self.raw.get("filename").and_then(Value::as_str)
    }

    /// Columns the backend read from the dataset.
    pub fn columns(&self) -> Vec<String> {
        self.raw
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A headline percentage with its caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageMetric {
    pub percentage: f64,
    pub status_text: String,
}

/// A headline count with its caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountMetric {
    pub count: u64,
    pub status_text: String,
}

/// The four headline numbers of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub overall_fairness: PercentageMetric,
    pub critical_issues: CountMetric,
    pub groups_analyzed: CountMetric,
    pub confidence_level: PercentageMetric,
}

/// A prompt whose response the backend judged biased.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailingExample {
    pub question: String,
    pub protected_attribute: String,
    pub protected_value: String,
    pub agent_response: String,
    pub reason: String,
}

/// One issue found by the scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueSummary {
    pub name: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub failing_examples: Vec<FailingExample>,
    pub test_results_count: u64,
}

/// A prompt and the agent's answer.
///
/// The protected attribute's value is stored under the attribute's own name
/// (for example `gender`), so every other key lands in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptDetail {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub agent_response: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// Scan details shown below the headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedAnalysis {
    pub test_type: String,
    pub overall_status: String,
    pub issues: Vec<IssueSummary>,
    pub scan_info: String,
    pub prompt_details: Vec<PromptDetail>,
}

/// Validated result of a fairness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dashboard_metrics: DashboardMetrics,
    #[serde(default)]
    pub detailed_analysis: DetailedAnalysis,
}

impl AnalysisResult {
    /// Issues whose severity reads as critical or high.
    pub fn critical_issues(&self) -> impl Iterator<Item = &IssueSummary> {
        self.detailed_analysis.issues.iter().filter(|issue| {
            matches!(
                issue.severity.to_lowercase().as_str(),
                "critical" | "high" | "major"
            )
        })
    }
}

/// `/fairness-check` response body before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FairnessCheckEnvelope {
    pub status: Option<String>,
    pub result: Option<Value>,
    pub message: Option<String>,
    /// Error text of framework-generated error responses.
    pub detail: Option<Value>,
}

impl FairnessCheckEnvelope {
    /// Turns the envelope into a typed result.
    pub fn into_result(self) -> Result<AnalysisResult> {
        if self.status.as_deref() != Some("success") {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .or_else(|| self.detail.as_ref().and_then(detail_text))
                .unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string());
            return Err(FairlensError::analysis_failed(message));
        }

        let Some(mut result) = self.result.filter(|r| !r.is_null()) else {
            return Err(FairlensError::analysis_failed(ANALYSIS_FAILED_MESSAGE));
        };

        let metrics = match result.get_mut("dashboard_metrics").map(Value::take) {
            Some(Value::Null) | None => {
                return Err(FairlensError::analysis_failed(MISSING_METRICS_MESSAGE))
            }
            Some(value) => value,
        };
        let dashboard_metrics: DashboardMetrics = serde_json::from_value(metrics).map_err(|e| {
            FairlensError::analysis_failed(format!(
                "Backend returned invalid dashboard metrics: {e}"
            ))
        })?;

        let detailed_analysis = match result.get_mut("detailed_analysis").map(Value::take) {
            Some(Value::Null) | None => DetailedAnalysis::default(),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                FairlensError::analysis_failed(format!(
                    "Backend returned invalid detailed analysis: {e}"
                ))
            })?,
        };
        if detailed_analysis == DetailedAnalysis::default() {
            warn!("Fairness check returned no detailed analysis");
        }

        Ok(AnalysisResult {
            dashboard_metrics,
            detailed_analysis,
        })
    }
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
