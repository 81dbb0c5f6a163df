//! Dataset summary building.
//!
//! [`DatasetProcessor`] runs the parser, the column type detector and the
//! protected-attribute heuristics over an uploaded file and assembles an
//! immutable [`DatasetSummary`].

use std::collections::HashSet;
use std::time::Instant;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, instrument};

use crate::dataset::inference::{
    format_number, parse_number, ColumnType, ColumnTypeDetector, DEFAULT_TYPE_THRESHOLD,
};
use crate::dataset::parser::{CsvParser, RawTable, RowPolicy};
use crate::dataset::protected::{ProtectedAttributeDetector, RiskLevel, VALUE_SAMPLE_LIMIT};
use crate::error::Result;
use crate::logging::LogConfig;

/// Fixed confidence shown next to the column analysis.
pub const AI_CONFIDENCE: f64 = 0.94;

/// Distinct values kept for categorical columns.
pub const UNIQUE_VALUE_LIMIT: usize = 10;

/// Distinct values kept as examples.
pub const EXAMPLE_LIMIT: usize = 3;

/// Default number of preview rows.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Metadata computed for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unique_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub range: Option<String>,
    pub is_protected: bool,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub examples: Vec<String>,
    pub sample_count: usize,
    /// Heuristic rule that flagged the column.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub matched_rule: Option<String>,
}

/// One preview row: header → cell in header order.
///
/// A header that occurs twice keeps its first position and the cell of its
/// last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewRow {
    cells: Vec<(String, String)>,
}

impl PreviewRow {
    fn insert(&mut self, header: &str, value: &str) {
        match self.cells.iter_mut().find(|(h, _)| h == header) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.cells.push((header.to_string(), value.to_string())),
        }
    }

    /// Cell for `header`.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Number of distinct headers in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates `(header, cell)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

impl Serialize for PreviewRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// Snapshot produced once per upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub identified_attributes: Vec<ColumnProfile>,
    pub processing_time: String,
    pub ai_confidence: f64,
    pub preview: Vec<PreviewRow>,
}

impl DatasetSummary {
    /// Profiles flagged as protected attributes.
    pub fn protected_columns(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.identified_attributes.iter().filter(|p| p.is_protected)
    }

    /// Profile for the column called `name`.
    pub fn profile(&self, name: &str) -> Option<&ColumnProfile> {
        self.identified_attributes.iter().find(|p| p.name == name)
    }

    /// Protected column with the highest confidence; earlier columns win ties.
    pub fn primary_protected_attribute(&self) -> Option<&ColumnProfile> {
        self.protected_columns().fold(None, |best, p| match best {
            Some(b) if b.confidence >= p.confidence => Some(b),
            _ => Some(p),
        })
    }
}

/// Configuration for [`DatasetProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// How rows with a wrong cell count are handled (default: pad)
    pub row_policy: RowPolicy,
    /// Number of preview rows (default: 5)
    pub preview_rows: usize,
    /// Share of values a type test must pass (default: 0.8)
    pub type_threshold: f64,
    /// Values inspected by value-set protected rules (default: 100)
    pub value_sample_limit: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            row_policy: RowPolicy::Pad,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            type_threshold: DEFAULT_TYPE_THRESHOLD,
            value_sample_limit: VALUE_SAMPLE_LIMIT,
        }
    }
}

/// Builder for [`DatasetProcessor`].
pub struct DatasetProcessorBuilder {
    config: ProcessorConfig,
    protected: Option<ProtectedAttributeDetector>,
    log: LogConfig,
}

impl DatasetProcessorBuilder {
    /// Sets the row policy.
    pub fn row_policy(mut self, policy: RowPolicy) -> Self {
        self.config.row_policy = policy;
        self
    }

    /// Sets the number of preview rows.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// Sets the type detection threshold.
    pub fn type_threshold(mut self, threshold: f64) -> Self {
        self.config.type_threshold = threshold;
        self
    }

    /// Sets how many values value-set rules inspect.
    ///
    /// Ignored when a custom detector is supplied.
    pub fn value_sample_limit(mut self, limit: usize) -> Self {
        self.config.value_sample_limit = limit;
        self
    }

    /// Uses a custom protected-attribute detector.
    pub fn protected_detector(mut self, detector: ProtectedAttributeDetector) -> Self {
        self.protected = Some(detector);
        self
    }

    /// Sets logging verbosity; per-column decisions are logged only when
    /// [`LogConfig::log_column_details`] is set.
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Builds the processor.
    pub fn build(self) -> DatasetProcessor {
        let limit = self.config.value_sample_limit;
        let protected = self.protected.unwrap_or_else(|| {
            ProtectedAttributeDetector::builder()
                .value_sample_limit(limit)
                .build()
        });
        DatasetProcessor {
            parser: CsvParser::new().with_row_policy(self.config.row_policy),
            types: ColumnTypeDetector::builder()
                .threshold(self.config.type_threshold)
                .build(),
            protected,
            config: self.config,
            log: self.log,
        }
    }
}

/// Turns raw dataset text into a [`DatasetSummary`].
#[derive(Debug, Clone)]
pub struct DatasetProcessor {
    config: ProcessorConfig,
    parser: CsvParser,
    types: ColumnTypeDetector,
    protected: ProtectedAttributeDetector,
    log: LogConfig,
}

impl DatasetProcessor {
    /// Creates a builder with default configuration.
    pub fn builder() -> DatasetProcessorBuilder {
        DatasetProcessorBuilder {
            config: ProcessorConfig::default(),
            protected: None,
            log: LogConfig::default(),
        }
    }

    /// Creates a processor with default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The active configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Parses and profiles `text`.
    ///
    /// # Errors
    ///
    /// Propagates parser errors: empty input, or a malformed row under
    /// [`RowPolicy::Reject`].
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn process(&self, text: &str) -> Result<DatasetSummary> {
        let started = Instant::now();
        let table = self.parser.parse(text)?;
        let summary = self.summarize(&table, started);

        info!(
            rows = summary.row_count,
            columns = summary.column_count,
            protected = summary.protected_columns().count(),
            processing_time = %summary.processing_time,
            "Processed dataset"
        );
        Ok(summary)
    }

    /// Profiles an already parsed table.
    pub fn process_table(&self, table: &RawTable) -> DatasetSummary {
        self.summarize(table, Instant::now())
    }

    /// Profiles one column from its name and raw cells.
    pub fn profile_column<S: AsRef<str>>(&self, name: &str, cells: &[S]) -> ColumnProfile {
        let values: Vec<&str> = cells
            .iter()
            .map(AsRef::as_ref)
            .filter(|v| !v.is_empty())
            .collect();

        let distinct = first_distinct(&values, UNIQUE_VALUE_LIMIT);
        let column_type = self.types.detect(&values);
        let assessment = self.protected.assess(name, &values);

        let range = (column_type == ColumnType::Numerical)
            .then(|| numeric_range(&values))
            .flatten();

        if self.log.log_column_details {
            debug!(
                column = %self.log.truncate(name),
                column_type = %column_type,
                protected = assessment.is_protected,
                rule = assessment.matched_rule.as_deref().unwrap_or("none"),
                "Profiled column"
            );
        }

        ColumnProfile {
            name: name.to_string(),
            column_type,
            unique_values: (column_type == ColumnType::Categorical).then(|| distinct.clone()),
            range,
            is_protected: assessment.is_protected,
            confidence: assessment.confidence,
            risk_level: assessment.risk_level,
            examples: distinct.into_iter().take(EXAMPLE_LIMIT).collect(),
            sample_count: values.len(),
            matched_rule: assessment.matched_rule,
        }
    }

    fn summarize(&self, table: &RawTable, started: Instant) -> DatasetSummary {
        let identified_attributes = table
            .headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let cells: Vec<&str> = table.column(index).collect();
                self.profile_column(header, &cells)
            })
            .collect();

        let preview = (0..table.row_count().min(self.config.preview_rows))
            .map(|row| {
                let mut preview_row = PreviewRow::default();
                for (index, header) in table.headers.iter().enumerate() {
                    preview_row.insert(header, table.cell(row, index));
                }
                preview_row
            })
            .collect();

        DatasetSummary {
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: table.headers.clone(),
            identified_attributes,
            processing_time: format!("{:.1} seconds", started.elapsed().as_secs_f64()),
            ai_confidence: AI_CONFIDENCE,
            preview,
        }
    }
}

impl Default for DatasetProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn first_distinct(values: &[&str], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(**v))
        .take(limit)
        .map(|v| (*v).to_string())
        .collect()
}

fn numeric_range(values: &[&str]) -> Option<String> {
    let mut numbers = values.iter().filter_map(|v| parse_number(v));
    let first = numbers.next()?;
    let (lo, hi) = numbers.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n)));
    Some(format!("{} - {}", format_number(lo), format_number(hi)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
name,Gender,age,city,score,joined,member
Ann,Female,34,Oslo,88.5,2021-03-01,yes
Bob,Male,45,Bergen,92,2020-11-15,no
Cid,Male,29,Oslo,75,2019-07-30,yes
Dee,Female,52,Trondheim,81,2022-01-09,no
Eve,Female,41,Oslo,95,2018-05-21,yes
Fay,Female,38,Bergen,67,2023-02-14,no
";

    #[test]
    fn test_summary_shape() {
        let summary = DatasetProcessor::new().process(SAMPLE).unwrap();
        assert_eq!(summary.row_count, 6);
        assert_eq!(summary.column_count, 7);
        assert_eq!(summary.columns[1], "Gender");
        assert_eq!(summary.identified_attributes.len(), 7);
        assert_eq!(summary.preview.len(), 5);
        assert_eq!(summary.ai_confidence, AI_CONFIDENCE);
        assert!(summary.processing_time.ends_with(" seconds"));
    }

    #[test]
    fn test_column_profiles() {
        let summary = DatasetProcessor::new().process(SAMPLE).unwrap();

        let gender = summary.profile("Gender").unwrap();
        assert_eq!(gender.column_type, ColumnType::Categorical);
        assert_eq!(
            gender.unique_values.as_deref(),
            Some(&["Female".to_string(), "Male".to_string()][..])
        );
        assert!(gender.is_protected);
        assert_eq!(gender.confidence, 0.95);

        let age = summary.profile("age").unwrap();
        assert_eq!(age.column_type, ColumnType::Numerical);
        assert_eq!(age.range.as_deref(), Some("29 - 52"));
        assert!(age.unique_values.is_none());
        assert_eq!(age.confidence, 0.92);

        let score = summary.profile("score").unwrap();
        assert_eq!(score.range.as_deref(), Some("67 - 95"));
        // numeric range heuristic: 67..95 looks like an age column
        assert!(score.is_protected);
        assert_eq!(score.confidence, 0.85);

        let joined = summary.profile("joined").unwrap();
        assert_eq!(joined.column_type, ColumnType::Date);
        assert!(joined.range.is_none() && joined.unique_values.is_none());

        let member = summary.profile("member").unwrap();
        assert_eq!(member.column_type, ColumnType::Boolean);

        let city = summary.profile("city").unwrap();
        assert_eq!(city.examples, vec!["Oslo", "Bergen", "Trondheim"]);
        assert_eq!(city.sample_count, 6);
        assert!(!city.is_protected);
        assert_eq!(city.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_empty_cells_are_not_sampled() {
        let summary = DatasetProcessor::new()
            .process("id,comment\n1,\n2,late\n3\n")
            .unwrap();
        let comment = summary.profile("comment").unwrap();
        assert_eq!(comment.sample_count, 1);
        assert_eq!(summary.preview[2].get("comment"), Some(""));
    }

    #[test]
    fn test_all_empty_column_is_unknown() {
        let summary = DatasetProcessor::new().process("a,b\n1,\n2,\n").unwrap();
        let b = summary.profile("b").unwrap();
        assert_eq!(b.column_type, ColumnType::Unknown);
        assert_eq!(b.sample_count, 0);
        assert!(b.examples.is_empty());
        assert!(b.unique_values.is_none());
    }

    #[test]
    fn test_unique_values_capped_at_ten() {
        let mut text = String::from("code\n");
        for i in 0..25 {
            text.push_str(&format!("c{i}\n"));
        }
        let summary = DatasetProcessor::new().process(&text).unwrap();
        let code = summary.profile("code").unwrap();
        assert_eq!(code.unique_values.as_ref().map(Vec::len), Some(10));
        assert_eq!(code.examples, vec!["c0", "c1", "c2"]);
        assert_eq!(code.sample_count, 25);
    }

    #[test]
    fn test_preview_with_duplicate_headers() {
        let summary = DatasetProcessor::new().process("x,y,x\n1,2,3\n").unwrap();
        let row = &summary.preview[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("x"), Some("3"));
        let json = serde_json::to_string(row).unwrap();
        assert_eq!(json, r#"{"x":"3","y":"2"}"#);
    }

    #[test]
    fn test_serialized_keys_match_dashboard_contract() {
        let summary = DatasetProcessor::new().process("Gender\nMale\nFemale\n").unwrap();
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["rowCount"], 2);
        assert_eq!(value["aiConfidence"], 0.94);
        let column = &value["identifiedAttributes"][0];
        assert_eq!(column["type"], "categorical");
        assert_eq!(column["isProtected"], true);
        assert_eq!(column["riskLevel"], "high");
        assert_eq!(column["sampleCount"], 2);
        assert!(column.get("range").is_none());
    }

    #[test]
    fn test_primary_protected_attribute() {
        let summary = DatasetProcessor::new()
            .process("zip,race,gender\n1000,a,b\n")
            .unwrap();
        assert_eq!(summary.primary_protected_attribute().unwrap().name, "race");

        let none = DatasetProcessor::new().process("notes\nhello\n").unwrap();
        assert!(none.primary_protected_attribute().is_none());
    }

    #[test]
    fn test_configured_preview_rows() {
        let processor = DatasetProcessor::builder().preview_rows(2).build();
        let summary = processor.process(SAMPLE).unwrap();
        assert_eq!(summary.preview.len(), 2);
        assert_eq!(processor.config().preview_rows, 2);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_output(processor: &DatasetProcessor) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            processor.process(SAMPLE).unwrap();
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_column_details_follow_log_config() {
        let quiet = logged_output(&DatasetProcessor::new());
        assert!(quiet.contains("Processed dataset"));
        assert!(!quiet.contains("Profiled column"));

        let verbose = DatasetProcessor::builder()
            .log_config(LogConfig::verbose())
            .build();
        let output = logged_output(&verbose);
        assert!(output.contains("Profiled column"));
        assert!(output.contains("column=Gender"));
    }
}
