//! End-to-end tests of dataset profiling.

use fairlens::dataset::inference::ColumnType;
use fairlens::dataset::protected::RiskLevel;
use fairlens::dataset::{DatasetProcessor, RowPolicy};
use fairlens::error::FairlensError;

const LOANS: &str = "\
applicant_id,Gender,Years,City,Notes,annual_income,approved,application_date
1001,Male,34,m,called twice,52000,yes,2024-01-05
1002,Female,51,f,left message,61000,no,2024-01-09

1003,Female,22,m,no answer,38000,yes,2024-02-11
1004,Male,45,unknown,prefers email,75000,yes,2024-02-20
1005,Male,75,f,follow up,44000,no,2024-03-02
1006,Female,18,m,n/a,29000,yes,2024-03-15
";

#[test]
fn test_row_and_column_counts() {
    let summary = DatasetProcessor::new().process(LOANS).unwrap();
    // seven non-blank lines, one of them the header
    assert_eq!(summary.row_count, 6);
    assert_eq!(summary.column_count, 8);
    assert_eq!(summary.columns.len(), 8);
    assert_eq!(summary.identified_attributes.len(), 8);
    assert_eq!(summary.preview.len(), 5);
}

#[test]
fn test_protected_attribute_detection() {
    let summary = DatasetProcessor::new().process(LOANS).unwrap();

    let gender = summary.profile("Gender").unwrap();
    assert!(gender.is_protected);
    assert_eq!(gender.confidence, 0.95);
    assert_eq!(gender.risk_level, RiskLevel::High);

    // value-set rule: single-letter gender codes under an unrelated name
    let city = summary.profile("City").unwrap();
    assert!(city.is_protected);
    assert_eq!(city.confidence, 0.90);
    assert_eq!(city.risk_level, RiskLevel::High);

    // numeric-range rule: 18..=75 looks like an age
    let years = summary.profile("Years").unwrap();
    assert!(years.is_protected);
    assert_eq!(years.confidence, 0.85);
    assert_eq!(years.range.as_deref(), Some("18 - 75"));

    let notes = summary.profile("Notes").unwrap();
    assert!(!notes.is_protected);
    assert_eq!(notes.confidence, 0.10);
    assert_eq!(notes.risk_level, RiskLevel::Low);

    let income = summary.profile("annual_income").unwrap();
    assert_eq!(income.risk_level, RiskLevel::Medium);
    assert_eq!(income.column_type, ColumnType::Numerical);
}

#[test]
fn test_column_types() {
    let summary = DatasetProcessor::new().process(LOANS).unwrap();
    let type_of = |name: &str| summary.profile(name).unwrap().column_type;

    assert_eq!(type_of("applicant_id"), ColumnType::Numerical);
    assert_eq!(type_of("Gender"), ColumnType::Categorical);
    assert_eq!(type_of("approved"), ColumnType::Boolean);
    assert_eq!(type_of("application_date"), ColumnType::Date);
    assert_eq!(type_of("Notes"), ColumnType::Categorical);
}

#[test]
fn test_mixed_numeric_and_boolean_is_categorical() {
    let summary = DatasetProcessor::new()
        .process("flag\n1\n2\n3\ntrue\n")
        .unwrap();
    assert_eq!(
        summary.profile("flag").unwrap().column_type,
        ColumnType::Categorical
    );
}

#[test]
fn test_processing_is_deterministic() {
    let processor = DatasetProcessor::new();
    let first = processor.process(LOANS).unwrap();
    let second = processor.process(LOANS).unwrap();
    assert_eq!(first.identified_attributes, second.identified_attributes);
    assert_eq!(first.preview, second.preview);
    assert_eq!(first.columns, second.columns);
}

#[test]
fn test_empty_inputs() {
    let processor = DatasetProcessor::new();
    for text in ["", "\n\n", "   \r\n  \n"] {
        let err = processor.process(text).unwrap_err();
        assert!(matches!(err, FairlensError::EmptyInput));
        assert_eq!(err.user_message(), "Error processing dataset: Empty CSV file");
    }
}

#[test]
fn test_strict_rows() {
    let text = "a,b\n1,2\n3\n";
    assert!(DatasetProcessor::new().process(text).is_ok());

    let strict = DatasetProcessor::builder()
        .row_policy(RowPolicy::Reject)
        .build();
    let err = strict.process(text).unwrap_err();
    assert!(matches!(
        err,
        FairlensError::MalformedRow {
            line: 3,
            expected: 2,
            found: 1
        }
    ));
}

#[test]
fn test_summary_json_contract() {
    let summary = DatasetProcessor::new().process(LOANS).unwrap();
    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["rowCount"], 6);
    assert_eq!(value["columnCount"], 8);
    assert_eq!(value["aiConfidence"], 0.94);
    assert!(value["processingTime"]
        .as_str()
        .unwrap()
        .ends_with(" seconds"));
    assert_eq!(value["preview"][0]["Gender"], "Male");

    let years = &value["identifiedAttributes"][2];
    assert_eq!(years["name"], "Years");
    assert_eq!(years["type"], "numerical");
    assert_eq!(years["range"], "18 - 75");
    assert_eq!(years["isProtected"], true);
    assert_eq!(years["riskLevel"], "high");
    assert_eq!(years["sampleCount"], 6);
}
