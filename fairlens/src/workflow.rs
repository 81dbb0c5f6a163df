//! End-to-end flow: read a file, profile it, upload it, analyse it.
//!
//! [`Workflow`] never fails outright. Each step takes the current
//! [`AppState`] and returns the next one; errors end up in
//! [`AppState::last_error`] as the message shown to the user.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::backend::{BackendClient, FairnessRequest};
use crate::catalog::FairnessSelection;
use crate::dataset::DatasetProcessor;
use crate::error::FairlensError;
use crate::intake::{read_upload, DatasetUpload};
use crate::state::{AppState, Ticket};

/// Runs dataset and analysis operations against a backend.
#[derive(Clone)]
pub struct Workflow {
    processor: DatasetProcessor,
    client: BackendClient,
}

impl Workflow {
    /// Creates a workflow from a processor and a backend client.
    pub fn new(processor: DatasetProcessor, client: BackendClient) -> Self {
        Self { processor, client }
    }

    /// The dataset processor.
    pub fn processor(&self) -> &DatasetProcessor {
        &self.processor
    }

    /// The backend client.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Reads, profiles and uploads the file at `path`.
    #[instrument(skip(self, state))]
    pub async fn load_file(&self, state: &AppState, path: &Path) -> AppState {
        let (loading, ticket) = state.begin_dataset();
        match read_upload(path).await {
            Ok(upload) => self.ingest(loading, ticket, upload).await,
            Err(e) => fail_dataset(&loading, ticket, e),
        }
    }

    /// Profiles and uploads a file already in memory.
    pub async fn load_upload(&self, state: &AppState, upload: DatasetUpload) -> AppState {
        let (loading, ticket) = state.begin_dataset();
        self.ingest(loading, ticket, upload).await
    }

    async fn ingest(&self, loading: AppState, ticket: Ticket, upload: DatasetUpload) -> AppState {
        let summary = match self.processor.process(&upload.text) {
            Ok(summary) => Arc::new(summary),
            Err(e) => return fail_dataset(&loading, ticket, e),
        };
        let processed = loading.dataset_processed(ticket, summary);

        match self.client.upload(&upload).await {
            Ok(receipt) => {
                let filename = receipt
                    .filename()
                    .map(str::to_string)
                    .unwrap_or_else(|| upload.file_name.clone());
                info!(file = %filename, "Dataset ready for analysis");
                processed.dataset_uploaded(ticket, filename)
            }
            Err(e) => fail_dataset(&processed, ticket, e),
        }
    }

    /// Runs a fairness analysis on the uploaded dataset.
    ///
    /// The protected attribute is the first one selected in `state`, or
    /// `gender` when none is.
    #[instrument(skip(self, state), fields(dimension = %selection.dimension))]
    pub async fn analyze(&self, state: &AppState, selection: FairnessSelection) -> AppState {
        let (running, ticket) = match state.begin_analysis(selection.clone()) {
            Ok(started) => started,
            Err(e) => return state.with_error(e.user_message()),
        };
        // begin_analysis only succeeds once a dataset is uploaded
        let filename = running.uploaded_filename().unwrap_or_default();
        let request = FairnessRequest::new(filename, running.protected_attribute(), selection);
        match self.client.fairness_check(&request).await {
            Ok(result) => running.analysis_succeeded(ticket, result),
            Err(e) => {
                error!(error = %e, "Analysis failed");
                running.analysis_failed(ticket, e.user_message())
            }
        }
    }
}

fn fail_dataset(state: &AppState, ticket: Ticket, err: FairlensError) -> AppState {
    error!(error = %err, retryable = err.is_retryable(), "Dataset step failed");
    state.dataset_failed(ticket, err.user_message())
}
