//! Column type detection from string values.
//!
//! Detection runs a fixed sequence of coercion tests and returns the first
//! type whose match ratio reaches the threshold:
//!
//! 1. numerical
//! 2. date
//! 3. boolean
//! 4. categorical (fallback)
//!
//! A column of values that are all `1`/`0` is therefore numerical, not boolean.
//!
//! # Example
//!
//! ```rust
//! use fairlens::dataset::inference::{ColumnType, ColumnTypeDetector};
//!
//! let detector = ColumnTypeDetector::new();
//! assert_eq!(detector.detect(&["1", "2", "3.5"]), ColumnType::Numerical);
//! assert_eq!(detector.detect(&["2024-01-05", "2023-12-31"]), ColumnType::Date);
//! assert_eq!(detector.detect(&["yes", "no", "Y"]), ColumnType::Boolean);
//! assert_eq!(detector.detect(&["red", "blue"]), ColumnType::Categorical);
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default share of values that must pass a coercion test.
pub const DEFAULT_TYPE_THRESHOLD: f64 = 0.8;

/// Tokens accepted as booleans (compared case-insensitively).
pub const BOOLEAN_TOKENS: [&str; 8] = ["true", "false", "yes", "no", "1", "0", "y", "n"];

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$")
        .expect("Hard-coded regex pattern should be valid")
});

const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y.%m.%d",
];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numerical,
    Categorical,
    Boolean,
    Date,
    Unknown,
}

impl ColumnType {
    /// Lower-case name as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numerical => "numerical",
            ColumnType::Categorical => "categorical",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a numeric string, accepting sign, fraction and exponent forms.
///
/// Surrounding whitespace is ignored; empty strings are not numbers.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if !NUMBER_PATTERN.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Formats a number the way it is shown in column ranges.
///
/// Integral values print without a fractional part (`18`, not `18.0`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Returns true when `value` parses as a calendar date or date-time.
pub fn parse_date(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    DateTime::parse_from_rfc3339(trimmed).is_ok()
        || DateTime::parse_from_rfc2822(trimmed).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|format| NaiveDate::parse_from_str(trimmed, format).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(trimmed, format).is_ok())
}

/// Returns true when `value` is one of [`BOOLEAN_TOKENS`].
pub fn is_boolean_token(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}

/// Per-test match counts for one column.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeStats {
    pub total: usize,
    pub numeric_matches: usize,
    pub date_matches: usize,
    pub boolean_matches: usize,
}

impl TypeStats {
    fn ratio(&self, matches: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            matches as f64 / self.total as f64
        }
    }
}

/// Builder for [`ColumnTypeDetector`].
#[derive(Debug, Clone)]
pub struct ColumnTypeDetectorBuilder {
    threshold: f64,
}

impl ColumnTypeDetectorBuilder {
    /// Sets the share of values (0..=1) that must pass a test.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builds the detector.
    pub fn build(self) -> ColumnTypeDetector {
        ColumnTypeDetector {
            threshold: self.threshold,
        }
    }
}

/// Threshold-based column type detector.
#[derive(Debug, Clone)]
pub struct ColumnTypeDetector {
    threshold: f64,
}

impl ColumnTypeDetector {
    /// Creates a builder starting from the default threshold.
    pub fn builder() -> ColumnTypeDetectorBuilder {
        ColumnTypeDetectorBuilder {
            threshold: DEFAULT_TYPE_THRESHOLD,
        }
    }

    /// Creates a detector with the default threshold.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Counts how many values pass each coercion test.
    pub fn collect_stats<S: AsRef<str>>(&self, values: &[S]) -> TypeStats {
        let mut stats = TypeStats {
            total: values.len(),
            ..TypeStats::default()
        };
        for value in values {
            let value = value.as_ref();
            if parse_number(value).is_some() {
                stats.numeric_matches += 1;
            }
            if parse_date(value) {
                stats.date_matches += 1;
            }
            if is_boolean_token(value) {
                stats.boolean_matches += 1;
            }
        }
        stats
    }

    /// Classifies a column from its non-empty values.
    pub fn detect<S: AsRef<str>>(&self, values: &[S]) -> ColumnType {
        self.classify(&self.collect_stats(values))
    }

    /// Applies the ordered thresholds to precomputed statistics.
    pub fn classify(&self, stats: &TypeStats) -> ColumnType {
        if stats.total == 0 {
            ColumnType::Unknown
        } else if stats.ratio(stats.numeric_matches) >= self.threshold {
            ColumnType::Numerical
        } else if stats.ratio(stats.date_matches) >= self.threshold {
            ColumnType::Date
        } else if stats.ratio(stats.boolean_matches) >= self.threshold {
            ColumnType::Boolean
        } else {
            ColumnType::Categorical
        }
    }
}

impl Default for ColumnTypeDetector {
    fn default() -> Self {
        Self::new()
    }
}
