//! Property-based tests for parsing, type detection and protected-attribute rules.

use fairlens::dataset::inference::{ColumnType, ColumnTypeDetector};
use fairlens::dataset::protected::{ProtectedAttributeDetector, RiskLevel};
use fairlens::dataset::{parse_csv, DatasetProcessor};
use fairlens::error::MAX_UPLOAD_BYTES;
use fairlens::intake::UploadCandidate;
use proptest::prelude::*;

/// Cells without separators, quotes or line breaks.
fn cell() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._-]{0,12}"
}

fn table() -> impl Strategy<Value = (usize, Vec<Vec<String>>)> {
    (1usize..6).prop_flat_map(|columns| {
        (
            Just(columns),
            prop::collection::vec(prop::collection::vec(cell(), columns), 0..20),
        )
    })
}

fn render(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut text = headers.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

proptest! {
    #[test]
    fn row_count_is_non_blank_lines_minus_header((columns, rows) in table()) {
        let headers: Vec<String> = (0..columns).map(|i| format!("h{i}")).collect();
        let text = render(&headers, &rows);

        let non_blank = text.split('\n').filter(|l| !l.trim().is_empty()).count();
        let table = parse_csv(&text).unwrap();

        prop_assert_eq!(table.row_count(), non_blank - 1);
        prop_assert_eq!(table.column_count(), columns);
    }

    #[test]
    fn parsed_cells_are_unquoted(raw in prop::collection::vec("[ \"a-z]{0,8}", 1..6)) {
        let text = format!("{}\n", raw.join(","));
        let table = parse_csv(&text);
        if text.trim().is_empty() {
            prop_assert!(table.is_err());
        } else {
            for header in &table.unwrap().headers {
                prop_assert!(!header.contains('"'));
            }
        }
    }

    #[test]
    fn integers_are_numerical(values in prop::collection::vec(-100_000i64..100_000, 1..50)) {
        let strings: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        prop_assert_eq!(ColumnTypeDetector::new().detect(&strings), ColumnType::Numerical);
    }

    #[test]
    fn detection_is_deterministic(values in prop::collection::vec(cell(), 0..30)) {
        let detector = ColumnTypeDetector::new();
        prop_assert_eq!(detector.detect(&values), detector.detect(&values));
    }

    #[test]
    fn gender_named_columns_are_always_high_risk(
        prefix in "[a-z_]{0,6}",
        suffix in "[a-z_]{0,6}",
        values in prop::collection::vec(cell(), 0..10),
    ) {
        let name = format!("{prefix}Gender{suffix}");
        let assessment = ProtectedAttributeDetector::new().assess(&name, &values);
        prop_assert!(assessment.is_protected);
        prop_assert_eq!(assessment.risk_level, RiskLevel::High);
    }

    #[test]
    fn confidence_is_a_probability(name in "[a-zA-Z_]{1,16}", values in prop::collection::vec(cell(), 0..20)) {
        let assessment = ProtectedAttributeDetector::new().assess(&name, &values);
        prop_assert!((0.0..=1.0).contains(&assessment.confidence));
        if !assessment.is_protected {
            prop_assert_eq!(assessment.risk_level, RiskLevel::Low);
        }
    }

    #[test]
    fn profiles_respect_sampling_limits((columns, rows) in table()) {
        let headers: Vec<String> = (0..columns).map(|i| format!("col{i}")).collect();
        let summary = DatasetProcessor::new().process(&render(&headers, &rows)).unwrap();

        prop_assert!(summary.preview.len() <= 5);
        for profile in &summary.identified_attributes {
            prop_assert!(profile.examples.len() <= 3);
            prop_assert!(profile.sample_count <= summary.row_count);
            if let Some(unique) = &profile.unique_values {
                prop_assert!(unique.len() <= 10);
            }
            if profile.column_type != ColumnType::Numerical {
                prop_assert!(profile.range.is_none());
            }
        }
    }

    #[test]
    fn upload_size_limit(size in 0u64..(2 * MAX_UPLOAD_BYTES)) {
        let result = UploadCandidate::new("data.csv", size).validate();
        prop_assert_eq!(result.is_ok(), size <= MAX_UPLOAD_BYTES);
    }
}
