//! Client for the external fairness analysis backend.
//!
//! The backend exposes two endpoints: `POST /upload` stores a dataset and
//! `POST /fairness-check` runs an analysis on a stored dataset. Responses are
//! validated here so the rest of the crate only sees typed results.

mod client;
mod config;
mod types;

pub use client::{BackendClient, FairnessRequest};
pub use config::{BackendConfig, API_URL_ENV, DEFAULT_ENDPOINT};
pub use types::{
    AnalysisResult, CountMetric, DashboardMetrics, DetailedAnalysis, FailingExample,
    IssueSummary, PercentageMetric, PromptDetail, UploadReceipt,
};
