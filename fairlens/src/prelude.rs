//! Prelude for commonly used types and traits in fairlens.

pub use crate::backend::{AnalysisResult, BackendClient, BackendConfig, FairnessRequest};
pub use crate::catalog::{FairnessDimension, FairnessSelection};
pub use crate::dataset::{
    ColumnProfile, ColumnType, DatasetProcessor, DatasetSummary, RiskLevel, RowPolicy,
};
pub use crate::error::{ErrorContext, FairlensError, Result};
pub use crate::formatters::{FairnessReport, FormatterConfig, ReportFormatter};
pub use crate::intake::{read_upload, DatasetUpload, UploadCandidate};
pub use crate::logging::LogConfig;
pub use crate::state::AppState;
pub use crate::workflow::Workflow;
