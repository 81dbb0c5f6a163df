//! Report formatting for dataset summaries and fairness analyses.
//!
//! A [`FairnessReport`] bundles what the user has seen so far: the dataset
//! summary, the selected protected attribute and fairness dimension, and the
//! analysis result or the error that replaced it. Formatters render it as
//! JSON, console text or Markdown.
//!
//! # Examples
//!
//! ```rust
//! use fairlens::dataset::DatasetProcessor;
//! use fairlens::formatters::{FairnessReport, HumanFormatter, ReportFormatter};
//!
//! let summary = DatasetProcessor::new().process("gender,score\nmale,3\n").unwrap();
//! let report = FairnessReport::for_summary(&summary);
//! let text = HumanFormatter::new().format(&report).unwrap();
//! assert!(text.contains("1 rows x 2 columns"));
//! ```

use std::fmt::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::backend::{AnalysisResult, IssueSummary};
use crate::catalog::FairnessSelection;
use crate::dataset::{ColumnProfile, DatasetSummary, RiskLevel};
use crate::error::{ErrorContext, Result};
use crate::state::{AnalysisStatus, AppState};

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the per-column table
    pub include_columns: bool,
    /// Include the preview rows
    pub include_preview: bool,
    /// Include individual issue details
    pub include_issues: bool,
    /// Maximum number of issues to display (`None` for all)
    pub max_issues: Option<usize>,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include the generation timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_columns: true,
            include_preview: true,
            include_issues: true,
            max_issues: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only headline numbers.
    pub fn minimal() -> Self {
        Self {
            include_columns: false,
            include_preview: false,
            include_issues: false,
            max_issues: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_columns: true,
            include_preview: false,
            include_issues: true,
            max_issues: Some(20),
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether to include the column table.
    pub fn with_columns(mut self, include: bool) -> Self {
        self.include_columns = include;
        self
    }

    /// Sets whether to include preview rows.
    pub fn with_preview(mut self, include: bool) -> Self {
        self.include_preview = include;
        self
    }

    /// Sets whether to include individual issues.
    pub fn with_issues(mut self, include: bool) -> Self {
        self.include_issues = include;
        self
    }

    /// Sets the maximum number of issues to display.
    pub fn with_max_issues(mut self, max: Option<usize>) -> Self {
        self.max_issues = max;
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Sets whether to include the generation timestamp.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    fn visible_issues<'a>(&self, issues: &'a [IssueSummary]) -> &'a [IssueSummary] {
        if !self.include_issues {
            return &[];
        }
        match self.max_issues {
            Some(max) => &issues[..max.min(issues.len())],
            None => issues,
        }
    }
}

/// Everything a report can show.
#[derive(Debug, Clone, Serialize)]
pub struct FairnessReport<'a> {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<&'a DatasetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected_attribute: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<&'a FairnessSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<&'a AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> FairnessReport<'a> {
    /// A report holding only a dataset summary.
    pub fn for_summary(summary: &'a DatasetSummary) -> Self {
        Self {
            generated_at: now(),
            dataset: Some(summary),
            protected_attribute: None,
            selection: None,
            analysis: None,
            error: None,
        }
    }

    /// A report of a fairness check run without a local dataset.
    pub fn for_analysis(
        protected_attribute: &'a str,
        selection: &'a FairnessSelection,
        analysis: &'a AnalysisResult,
    ) -> Self {
        Self {
            generated_at: now(),
            dataset: None,
            protected_attribute: Some(protected_attribute),
            selection: Some(selection),
            analysis: Some(analysis),
            error: None,
        }
    }

    /// A report of everything recorded in `state`.
    pub fn from_state(state: &'a AppState) -> Self {
        let analysis = state.analysis_result().map(|r| r.as_ref());
        let error = match state.analysis() {
            AnalysisStatus::Failed(message) => Some(message.as_str()),
            _ => state.last_error(),
        };
        Self {
            generated_at: now(),
            dataset: state.summary().map(|s| s.as_ref()),
            protected_attribute: state
                .selection()
                .map(|_| state.protected_attribute()),
            selection: state.selection(),
            analysis,
            error,
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Trait for rendering a [`FairnessReport`].
pub trait ReportFormatter {
    /// Formats a report with the formatter's own configuration.
    fn format(&self, report: &FairnessReport<'_>) -> Result<String>;

    /// Formats a report with a custom configuration.
    fn format_with_config(
        &self,
        report: &FairnessReport<'_>,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

/// Formats reports as structured JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    /// Creates a new JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &FairnessReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &FairnessReport<'_>,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut value = serde_json::to_value(report).context("Failed to encode report")?;
        filter_value(&mut value, config);
        let output = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .context("Failed to render report JSON")?;
        Ok(output)
    }
}

fn filter_value(value: &mut Value, config: &FormatterConfig) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    if !config.include_timestamps {
        root.remove("generated_at");
    }
    if let Some(dataset) = root.get_mut("dataset").and_then(Value::as_object_mut) {
        if !config.include_preview {
            dataset.remove("preview");
        }
        if !config.include_columns {
            dataset.remove("identifiedAttributes");
        }
    }
    if let Some(issues) = root
        .get_mut("analysis")
        .and_then(|a| a.get_mut("detailed_analysis"))
        .and_then(|d| d.get_mut("issues"))
        .and_then(Value::as_array_mut)
    {
        if !config.include_issues {
            issues.clear();
        } else if let Some(max) = config.max_issues {
            issues.truncate(max);
        }
    }
}

/// Formats reports for console output.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a new human formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a new human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(text: &str, code: &str, colors: bool) -> String {
    if colors {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn risk_color(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "31",
        RiskLevel::Medium => "33",
        RiskLevel::Low => "32",
    }
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &FairnessReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &FairnessReport<'_>,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        let colors = config.use_colors;

        writeln!(output)?;
        if let Some(summary) = report.dataset {
            writeln!(
                output,
                "📄 Dataset: {} rows x {} columns (processed in {}, AI confidence {})",
                summary.row_count,
                summary.column_count,
                summary.processing_time,
                percent(summary.ai_confidence)
            )?;

            let protected: Vec<&ColumnProfile> = summary.protected_columns().collect();
            writeln!(output)?;
            if protected.is_empty() {
                writeln!(output, "🛡️  No protected attributes detected")?;
            } else {
                writeln!(output, "🛡️  Protected attributes ({}):", protected.len())?;
                for column in protected {
                    writeln!(
                        output,
                        "   {} ({}) confidence {}, risk {}",
                        column.name,
                        column.column_type,
                        percent(column.confidence),
                        paint(column.risk_level.as_str(), risk_color(column.risk_level), colors)
                    )?;
                }
            }

            if config.include_columns {
                writeln!(output)?;
                writeln!(output, "📊 Columns:")?;
                for column in &summary.identified_attributes {
                    let detail = match (&column.range, &column.unique_values) {
                        (Some(range), _) => format!("range {range}"),
                        (None, Some(values)) => format!("{} distinct shown", values.len()),
                        (None, None) => format!("examples: {}", column.examples.join(", ")),
                    };
                    let marker = if column.is_protected { "⚠️ " } else { "  " };
                    writeln!(
                        output,
                        "   {marker} {:<24} {:<12} {:>5} values  {detail}",
                        column.name,
                        column.column_type.as_str(),
                        column.sample_count
                    )?;
                }
            }

            if config.include_preview && !summary.preview.is_empty() {
                writeln!(output)?;
                writeln!(output, "🔎 Preview:")?;
                writeln!(output, "   {}", summary.columns.join(" | "))?;
                for row in &summary.preview {
                    let cells: Vec<&str> = row.iter().map(|(_, v)| v).collect();
                    writeln!(output, "   {}", cells.join(" | "))?;
                }
            }
        }

        if let Some(selection) = report.selection {
            writeln!(output)?;
            writeln!(
                output,
                "⚖️  Fairness analysis: {} fairness on '{}' ({})",
                selection.dimension,
                report.protected_attribute.unwrap_or_default(),
                selection.metrics_param()
            )?;
        }

        if let Some(analysis) = report.analysis {
            let metrics = &analysis.dashboard_metrics;
            writeln!(
                output,
                "   Overall fairness: {:.1}% ({})",
                metrics.overall_fairness.percentage, metrics.overall_fairness.status_text
            )?;
            writeln!(
                output,
                "   Critical issues: {} ({})",
                paint(&metrics.critical_issues.count.to_string(), "31", colors),
                metrics.critical_issues.status_text
            )?;
            writeln!(
                output,
                "   Groups analyzed: {} ({})",
                metrics.groups_analyzed.count, metrics.groups_analyzed.status_text
            )?;
            writeln!(
                output,
                "   Confidence level: {:.1}% ({})",
                metrics.confidence_level.percentage, metrics.confidence_level.status_text
            )?;

            let detailed = &analysis.detailed_analysis;
            if !detailed.overall_status.is_empty() {
                writeln!(output, "   Status: {}", detailed.overall_status)?;
            }

            let issues = config.visible_issues(&detailed.issues);
            if !issues.is_empty() {
                writeln!(output)?;
                writeln!(output, "🔍 Issues Found:")?;
                for (i, issue) in issues.iter().enumerate() {
                    writeln!(output)?;
                    writeln!(output, "   Issue #{}: {}", i + 1, issue.name)?;
                    writeln!(output, "      Severity: {}", issue.severity)?;
                    writeln!(output, "      Status: {}", issue.status)?;
                    if !issue.description.is_empty() {
                        writeln!(output, "      {}", issue.description)?;
                    }
                    writeln!(
                        output,
                        "      Tests: {}, failing examples: {}",
                        issue.test_results_count,
                        issue.failing_examples.len()
                    )?;
                }
            }
            if detailed.issues.len() > issues.len() && config.include_issues {
                writeln!(output)?;
                writeln!(
                    output,
                    "   ... and {} more issues",
                    detailed.issues.len() - issues.len()
                )?;
            }
        }

        if let Some(error) = report.error {
            writeln!(output)?;
            writeln!(output, "❌ {}", paint(error, "31", colors))?;
        }

        if config.include_timestamps {
            writeln!(output)?;
            writeln!(output, "Generated: {}", report.generated_at)?;
        }
        Ok(output)
    }
}

/// Formats reports as Markdown for downloads and documentation.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a new Markdown formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    /// Creates a new Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &FairnessReport<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &FairnessReport<'_>,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(output, "{h} Fairness Report")?;
        writeln!(output)?;
        if config.include_timestamps {
            writeln!(output, "**Generated:** {}", report.generated_at)?;
            writeln!(output)?;
        }

        if let Some(summary) = report.dataset {
            writeln!(output, "{h}# Dataset")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Rows | {} |", summary.row_count)?;
            writeln!(output, "| Columns | {} |", summary.column_count)?;
            writeln!(
                output,
                "| Protected attributes | {} |",
                summary.protected_columns().count()
            )?;
            writeln!(output, "| Processing time | {} |", summary.processing_time)?;
            writeln!(output, "| AI confidence | {} |", percent(summary.ai_confidence))?;

            if config.include_columns {
                writeln!(output)?;
                writeln!(output, "{h}# Columns")?;
                writeln!(output)?;
                writeln!(output, "| Column | Type | Protected | Confidence | Risk | Examples |")?;
                writeln!(output, "|--------|------|-----------|------------|------|----------|")?;
                for column in &summary.identified_attributes {
                    writeln!(
                        output,
                        "| {} | {} | {} | {} | {} | {} |",
                        escape_cell(&column.name),
                        column.column_type,
                        if column.is_protected { "yes" } else { "no" },
                        percent(column.confidence),
                        column.risk_level,
                        escape_cell(&column.examples.join(", "))
                    )?;
                }
            }

            if config.include_preview && !summary.preview.is_empty() {
                writeln!(output)?;
                writeln!(output, "{h}# Preview")?;
                writeln!(output)?;
                let headers: Vec<String> = summary.preview[0]
                    .iter()
                    .map(|(header, _)| escape_cell(header))
                    .collect();
                writeln!(output, "| {} |", headers.join(" | "))?;
                writeln!(output, "|{}", "---|".repeat(headers.len()))?;
                for row in &summary.preview {
                    let cells: Vec<String> = row.iter().map(|(_, v)| escape_cell(v)).collect();
                    writeln!(output, "| {} |", cells.join(" | "))?;
                }
            }
            writeln!(output)?;
        }

        if let Some(selection) = report.selection {
            writeln!(output, "{h}# Fairness Analysis")?;
            writeln!(output)?;
            writeln!(output, "- **Dimension:** {}", selection.dimension)?;
            writeln!(output, "- **Metrics:** {}", selection.metrics_param())?;
            if let Some(attribute) = report.protected_attribute {
                writeln!(output, "- **Protected attribute:** {attribute}")?;
            }
            writeln!(output)?;
        }

        if let Some(analysis) = report.analysis {
            let metrics = &analysis.dashboard_metrics;
            writeln!(output, "| Metric | Value | Status |")?;
            writeln!(output, "|--------|-------|--------|")?;
            writeln!(
                output,
                "| Overall fairness | {:.1}% | {} |",
                metrics.overall_fairness.percentage,
                escape_cell(&metrics.overall_fairness.status_text)
            )?;
            writeln!(
                output,
                "| Critical issues | {} | {} |",
                metrics.critical_issues.count,
                escape_cell(&metrics.critical_issues.status_text)
            )?;
            writeln!(
                output,
                "| Groups analyzed | {} | {} |",
                metrics.groups_analyzed.count,
                escape_cell(&metrics.groups_analyzed.status_text)
            )?;
            writeln!(
                output,
                "| Confidence level | {:.1}% | {} |",
                metrics.confidence_level.percentage,
                escape_cell(&metrics.confidence_level.status_text)
            )?;
            writeln!(output)?;

            let detailed = &analysis.detailed_analysis;
            let issues = config.visible_issues(&detailed.issues);
            if !issues.is_empty() {
                writeln!(output, "{h}# Issues")?;
                writeln!(output)?;
                for (i, issue) in issues.iter().enumerate() {
                    writeln!(output, "{h}## Issue #{}: {}", i + 1, issue.name)?;
                    writeln!(output)?;
                    writeln!(output, "- **Severity:** {}", issue.severity)?;
                    writeln!(output, "- **Status:** {}", issue.status)?;
                    writeln!(output, "- **Tests run:** {}", issue.test_results_count)?;
                    if !issue.description.is_empty() {
                        writeln!(output, "- **Description:** {}", issue.description)?;
                    }
                    for example in &issue.failing_examples {
                        writeln!(
                            output,
                            "  - `{}={}`: {} ({})",
                            example.protected_attribute,
                            example.protected_value,
                            example.question,
                            example.reason
                        )?;
                    }
                    writeln!(output)?;
                }
                if detailed.issues.len() > issues.len() {
                    writeln!(
                        output,
                        "> **Note:** {} additional issues not shown in this report.",
                        detailed.issues.len() - issues.len()
                    )?;
                    writeln!(output)?;
                }
            }
        }

        if let Some(error) = report.error {
            writeln!(output, "> **Error:** {error}")?;
            writeln!(output)?;
        }

        Ok(output)
    }
}
