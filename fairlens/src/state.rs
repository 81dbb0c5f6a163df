//! Immutable application state.
//!
//! Every transition returns a new [`AppState`]; nothing is mutated in place.
//! Long-running operations start by taking a [`Ticket`]. Their completion is
//! applied only while that ticket is still current, so an older upload or
//! analysis finishing late cannot overwrite newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::backend::AnalysisResult;
use crate::catalog::FairnessSelection;
use crate::dataset::DatasetSummary;
use crate::error::{FairlensError, Result};

/// Protected attribute used when the user selected none.
pub const DEFAULT_PROTECTED_ATTRIBUTE: &str = "gender";

/// Message for analyses requested before any upload succeeded.
pub const UPLOAD_REQUIRED_MESSAGE: &str = "Please upload a dataset first before running analysis.";

// Ticket ids are unique per process, not per snapshot lineage.
static NEXT_TICKET_ID: AtomicU64 = AtomicU64::new(1);

fn next_ticket_id() -> u64 {
    NEXT_TICKET_ID.fetch_add(1, Ordering::Relaxed)
}

/// Which kind of operation a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Dataset,
    Analysis,
}

/// Identity of one started operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    operation: Operation,
    id: u64,
}

impl Ticket {
    /// The operation this ticket was issued for.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Process-wide unique id of the operation.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn issue(operation: Operation) -> Self {
        Self {
            operation,
            id: next_ticket_id(),
        }
    }
}

/// Progress of the fairness analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Running,
    Succeeded(Arc<AnalysisResult>),
    Failed(String),
}

/// A snapshot of everything the user has done so far.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    summary: Option<Arc<DatasetSummary>>,
    uploaded_filename: Option<String>,
    selected_attributes: Vec<String>,
    selection: Option<FairnessSelection>,
    analysis: AnalysisStatus,
    dataset_loading: bool,
    last_error: Option<String>,
    dataset_ticket: Option<u64>,
    analysis_ticket: Option<u64>,
}

impl AppState {
    /// Creates the initial, empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of the current dataset.
    pub fn summary(&self) -> Option<&Arc<DatasetSummary>> {
        self.summary.as_ref()
    }

    /// Name under which the backend stored the current dataset.
    pub fn uploaded_filename(&self) -> Option<&str> {
        self.uploaded_filename.as_deref()
    }

    /// Protected attributes picked by the user.
    pub fn selected_attributes(&self) -> &[String] {
        &self.selected_attributes
    }

    /// First selected attribute, or [`DEFAULT_PROTECTED_ATTRIBUTE`].
    pub fn protected_attribute(&self) -> &str {
        self.selected_attributes
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROTECTED_ATTRIBUTE)
    }

    /// Dimension and metrics of the latest analysis request.
    pub fn selection(&self) -> Option<&FairnessSelection> {
        self.selection.as_ref()
    }

    /// Status of the analysis.
    pub fn analysis(&self) -> &AnalysisStatus {
        &self.analysis
    }

    /// Result of the latest successful analysis.
    pub fn analysis_result(&self) -> Option<&Arc<AnalysisResult>> {
        match &self.analysis {
            AnalysisStatus::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    /// True while a dataset is being read, processed or uploaded.
    pub fn is_dataset_loading(&self) -> bool {
        self.dataset_loading
    }

    /// True while an analysis is running.
    pub fn is_analysis_running(&self) -> bool {
        self.analysis == AnalysisStatus::Running
    }

    /// Message of the last failed operation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True if `ticket` is the operation of its kind this snapshot is waiting on.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        let current = match ticket.operation {
            Operation::Dataset => self.dataset_ticket,
            Operation::Analysis => self.analysis_ticket,
        };
        current == Some(ticket.id)
    }

    /// Starts loading a new dataset.
    ///
    /// Any dataset or analysis still in flight becomes stale.
    pub fn begin_dataset(&self) -> (Self, Ticket) {
        let ticket = Ticket::issue(Operation::Dataset);
        let mut next = self.clone();
        next.dataset_ticket = Some(ticket.id);
        next.analysis_ticket = None;
        next.dataset_loading = true;
        next.last_error = None;
        if next.analysis == AnalysisStatus::Running {
            next.analysis = AnalysisStatus::Idle;
        }
        (next, ticket)
    }

    /// Records the locally built summary.
    ///
    /// The previous dataset's upload, attribute choice and analysis are dropped.
    pub fn dataset_processed(&self, ticket: Ticket, summary: Arc<DatasetSummary>) -> Self {
        if !self.accepts(ticket, Operation::Dataset, "dataset_processed") {
            return self.clone();
        }
        let mut next = self.clone();
        next.summary = Some(summary);
        next.uploaded_filename = None;
        next.selected_attributes.clear();
        next.selection = None;
        next.analysis = AnalysisStatus::Idle;
        next
    }

    /// Records a successful upload and ends loading.
    pub fn dataset_uploaded(&self, ticket: Ticket, filename: impl Into<String>) -> Self {
        if !self.accepts(ticket, Operation::Dataset, "dataset_uploaded") {
            return self.clone();
        }
        let mut next = self.clone();
        next.uploaded_filename = Some(filename.into());
        next.dataset_loading = false;
        next
    }

    /// Ends loading with an error; an already processed summary is kept.
    pub fn dataset_failed(&self, ticket: Ticket, message: impl Into<String>) -> Self {
        if !self.accepts(ticket, Operation::Dataset, "dataset_failed") {
            return self.clone();
        }
        let mut next = self.clone();
        next.dataset_loading = false;
        next.last_error = Some(message.into());
        next
    }

    /// Replaces the selected protected attributes.
    pub fn select_protected_attributes<I, S>(&self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.selected_attributes = attributes.into_iter().map(Into::into).collect();
        next
    }

    /// Starts an analysis of the uploaded dataset.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::AnalysisFailed`] when no dataset has been
    /// uploaded yet.
    pub fn begin_analysis(&self, selection: FairnessSelection) -> Result<(Self, Ticket)> {
        if self.uploaded_filename.is_none() {
            return Err(FairlensError::analysis_failed(UPLOAD_REQUIRED_MESSAGE));
        }
        let ticket = Ticket::issue(Operation::Analysis);
        let mut next = self.clone();
        next.analysis_ticket = Some(ticket.id);
        next.selection = Some(selection);
        next.analysis = AnalysisStatus::Running;
        next.last_error = None;
        Ok((next, ticket))
    }

    /// Records a successful analysis.
    pub fn analysis_succeeded(&self, ticket: Ticket, result: AnalysisResult) -> Self {
        if !self.accepts(ticket, Operation::Analysis, "analysis_succeeded") {
            return self.clone();
        }
        let mut next = self.clone();
        next.analysis = AnalysisStatus::Succeeded(Arc::new(result));
        next
    }

    /// Records a failed analysis, clearing any previous result.
    pub fn analysis_failed(&self, ticket: Ticket, message: impl Into<String>) -> Self {
        if !self.accepts(ticket, Operation::Analysis, "analysis_failed") {
            return self.clone();
        }
        let message = message.into();
        let mut next = self.clone();
        next.analysis = AnalysisStatus::Failed(message.clone());
        next.last_error = Some(message);
        next
    }

    /// Records an error raised before any operation started.
    pub fn with_error(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.last_error = Some(message.into());
        next
    }

    fn accepts(&self, ticket: Ticket, expected: Operation, transition: &str) -> bool {
        if ticket.operation == expected && self.is_current(ticket) {
            return true;
        }
        warn!(
            transition,
            operation = ?ticket.operation,
            ticket_id = ticket.id,
            "Discarding stale completion"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FairnessDimension;
    use crate::dataset::DatasetProcessor;

    fn summary(text: &str) -> Arc<DatasetSummary> {
        Arc::new(DatasetProcessor::new().process(text).unwrap())
    }

    fn group() -> FairnessSelection {
        FairnessSelection::with_defaults(FairnessDimension::Group)
    }

    fn uploaded() -> AppState {
        let (state, ticket) = AppState::new().begin_dataset();
        state
            .dataset_processed(ticket, summary("gender\nmale\n"))
            .dataset_uploaded(ticket, "a.csv")
    }

    #[test]
    fn test_dataset_lifecycle() {
        let initial = AppState::new();
        let (loading, ticket) = initial.begin_dataset();
        assert!(loading.is_dataset_loading());
        assert!(!initial.is_dataset_loading());

        let processed = loading.dataset_processed(ticket, summary("a\n1\n"));
        assert!(processed.summary().is_some());
        assert!(processed.is_dataset_loading());

        let done = processed.dataset_uploaded(ticket, "a.csv");
        assert_eq!(done.uploaded_filename(), Some("a.csv"));
        assert!(!done.is_dataset_loading());
    }

    #[test]
    fn test_upload_failure_keeps_summary() {
        let (loading, ticket) = AppState::new().begin_dataset();
        let failed = loading
            .dataset_processed(ticket, summary("a\n1\n"))
            .dataset_failed(ticket, "boom");
        assert!(failed.summary().is_some());
        assert!(failed.uploaded_filename().is_none());
        assert_eq!(failed.last_error(), Some("boom"));
        assert!(!failed.is_dataset_loading());
    }

    #[test]
    fn test_stale_dataset_completion_is_discarded() {
        let (first, old_ticket) = AppState::new().begin_dataset();
        let (second, new_ticket) = first.begin_dataset();

        let after_stale = second.dataset_processed(old_ticket, summary("old\n1\n"));
        assert!(after_stale.summary().is_none());
        assert!(!after_stale.is_current(old_ticket));

        let after_current = after_stale.dataset_processed(new_ticket, summary("new\n1\n"));
        assert_eq!(after_current.summary().unwrap().columns, vec!["new"]);
    }

    #[test]
    fn test_overlapping_uploads_from_same_snapshot() {
        let base = AppState::new();
        let (_, first) = base.begin_dataset();
        let (loading, second) = base.begin_dataset();
        assert_ne!(first, second);

        let newer = loading.dataset_processed(second, summary("new\n1\n"));
        let late = newer.dataset_processed(first, summary("old\n1\n"));
        assert_eq!(late.summary().unwrap().columns, vec!["new"]);
        assert!(late.is_current(second));
        assert!(!late.is_current(first));

        let late_upload = late.dataset_uploaded(first, "old.csv");
        assert!(late_upload.uploaded_filename().is_none());
        assert!(late_upload.is_dataset_loading());
    }

    #[test]
    fn test_overlapping_analyses_from_same_snapshot() {
        let base = uploaded();
        let (_, first) = base.begin_analysis(group()).unwrap();
        let (running, second) = base
            .begin_analysis(FairnessSelection::with_defaults(FairnessDimension::Individual))
            .unwrap();

        let late = running.analysis_failed(first, "stale failure");
        assert!(late.is_analysis_running());
        assert!(late.last_error().is_none());

        let done = late.analysis_failed(second, "current failure");
        assert_eq!(done.last_error(), Some("current failure"));
    }

    #[test]
    fn test_analysis_requires_upload() {
        let err = AppState::new().begin_analysis(group()).unwrap_err();
        assert_eq!(err.user_message(), UPLOAD_REQUIRED_MESSAGE);
    }

    #[test]
    fn test_protected_attribute_default() {
        let state = uploaded();
        assert_eq!(state.protected_attribute(), "gender");
        let state = state.select_protected_attributes(["race", "age"]);
        assert_eq!(state.protected_attribute(), "race");
    }

    #[test]
    fn test_analysis_failure_clears_result() {
        let (running, ticket) = uploaded().begin_analysis(group()).unwrap();
        assert!(running.is_analysis_running());
        let failed = running.analysis_failed(ticket, "Fairness analysis failed.");
        assert!(failed.analysis_result().is_none());
        assert_eq!(
            failed.analysis(),
            &AnalysisStatus::Failed("Fairness analysis failed.".to_string())
        );
        assert_eq!(failed.last_error(), Some("Fairness analysis failed."));
    }

    #[test]
    fn test_new_dataset_invalidates_running_analysis() {
        let (running, analysis_ticket) = uploaded().begin_analysis(group()).unwrap();
        let (reloading, _) = running.begin_dataset();
        assert_eq!(reloading.analysis(), &AnalysisStatus::Idle);

        let late = reloading.analysis_failed(analysis_ticket, "late");
        assert_eq!(late.analysis(), &AnalysisStatus::Idle);
        assert!(late.last_error().is_none());
    }

    #[test]
    fn test_ticket_kind_must_match() {
        let (state, dataset_ticket) = AppState::new().begin_dataset();
        assert_eq!(dataset_ticket.operation(), Operation::Dataset);
        let (state, _) = state
            .dataset_uploaded(dataset_ticket, "a.csv")
            .begin_analysis(group())
            .unwrap();
        // a dataset ticket cannot complete an analysis
        let unchanged = state.analysis_failed(dataset_ticket, "wrong");
        assert!(unchanged.is_analysis_running());
    }
}
