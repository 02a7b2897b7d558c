//! Integration tests for the analysis engine.
//!
//! These tests load fixture files the way the CLI does and check the emitted
//! JSON documents end to end.

use lex_insight::{
    AnalysisConfig, AnalysisError, AnalysisOutput, Analyzer, DatasetLoader, OutputEncoding,
    encode_output,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> DataFrame {
    DatasetLoader::load(fixtures_path().join(filename)).expect("Failed to load fixture")
}

fn seeded_analyzer() -> Analyzer {
    Analyzer::builder()
        .config(AnalysisConfig::builder().sample_seed(42).build().unwrap())
        .build()
        .unwrap()
}

/// Load, analyze and encode a file the way the CLI does.
fn run_file(filename: &str) -> String {
    let output = match DatasetLoader::load(fixtures_path().join(filename)) {
        Ok(df) => seeded_analyzer().run(&df),
        Err(e) => AnalysisOutput::error(e.to_string()),
    };
    encode_output(&output, OutputEncoding::Utf8, false).unwrap()
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_employee_report_overview() {
    let df = load_fixture("employees.csv");
    let report = seeded_analyzer().analyze(&df).unwrap();

    let overview = &report.dataset_overview;
    assert_eq!(overview.rows, 24);
    assert_eq!(overview.columns, 5);
    assert_eq!(overview.numerical_columns, 2);
    assert_eq!(overview.categorical_columns, 3);
    assert_eq!(
        overview.numerical_columns + overview.categorical_columns,
        overview.columns
    );

    assert_eq!(
        report.dashboard_title,
        "Data Analysis: 5 Attributes & 24 Records"
    );
    assert_eq!(report.data_quality_audit.total_missing, 1);
    assert_eq!(report.data_quality_audit.missing.get("salary"), Some(1));
    assert_eq!(report.data_quality_audit.score, 99.2);
    assert_eq!(report.kpis.len(), 3);
    assert_eq!(report.kpis[2].change, "2 numbers, 3 categories");
}

#[test]
fn test_visualization_ids_are_unique() {
    let df = load_fixture("employees.csv");
    let report = seeded_analyzer().analyze(&df).unwrap();

    let ids: HashSet<&str> = report.visualizations.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids.len(), report.visualizations.len());
    assert!(ids.contains("hist_salary"));
    assert!(ids.contains("cat_hire_date"));
}

#[test]
fn test_salary_spike_is_reported() {
    let df = load_fixture("employees.csv");
    let report = seeded_analyzer().analyze(&df).unwrap();

    let titles: Vec<&str> = report.anomalies.iter().map(|i| i.title.as_str()).collect();
    assert!(titles.contains(&"Outliers in salary"));
    assert!(titles.contains(&"Data Fencing: salary"));
    assert!(!titles.contains(&"Outliers in age"));
}

#[test]
fn test_time_like_column_description() {
    let df = load_fixture("employees.csv");
    let report = seeded_analyzer().analyze(&df).unwrap();

    let hire = report
        .visualizations
        .iter()
        .find(|v| v.id == "cat_hire_date")
        .unwrap();
    assert!(hire.description.contains("time or date"));
}

// ============================================================================
// Output Encoding Tests
// ============================================================================

#[test]
fn test_output_is_strict_json() {
    let json = run_file("employees.csv");

    assert!(!json.contains("NaN"));
    assert!(!json.contains("Infinity"));
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert!(parsed.get("error").is_none());
    assert_eq!(parsed["dataset_overview"]["rows"], 24);
    assert!(parsed["visualizations"][0]["themeColor"].is_string());
}

#[test]
fn test_non_finite_values_become_null() {
    let df = df![
        "reading" => [1.0, f64::INFINITY, 3.0, 4.0, f64::NEG_INFINITY],
        "steady" => [1.0, 2.0, 3.0, 4.0, 5.0],
        "label" => ["a", "b", "a", "b", "a"],
    ]
    .unwrap();

    let output = seeded_analyzer().run(&df);
    let json = encode_output(&output, OutputEncoding::Utf8, true).unwrap();

    assert!(!json.contains("inf"));
    assert!(!json.contains("NaN"));
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert!(parsed.get("dashboard_title").is_some());
}

#[test]
fn test_seeded_runs_produce_identical_documents() {
    assert_eq!(run_file("employees.csv"), run_file("employees.csv"));
}

#[test]
fn test_ascii_output_escapes_city_names() {
    let df = load_fixture("employees.csv");
    let output = seeded_analyzer().run(&df);

    let ascii = encode_output(&output, OutputEncoding::Ascii, false).unwrap();
    assert!(ascii.is_ascii());
    assert!(ascii.contains("Z\\u00fcrich"));

    let utf8 = encode_output(&output, OutputEncoding::Utf8, false).unwrap();
    assert!(utf8.contains("Zürich"));
    assert_eq!(
        serde_json::from_str::<Value>(&ascii).unwrap(),
        serde_json::from_str::<Value>(&utf8).unwrap()
    );
}

// ============================================================================
// Loader and Error Document Tests
// ============================================================================

#[test]
fn test_semicolon_file_is_sniffed() {
    let df = load_fixture("semicolon.csv");
    assert_eq!(df.width(), 3);
    assert_eq!(df.height(), 4);

    let report = seeded_analyzer().analyze(&df).unwrap();
    assert_eq!(report.dataset_overview.numerical_columns, 2);
    assert_eq!(report.data_quality_audit.duplicate_row_count, 0);
}

#[test]
fn test_pipe_delimited_text_file() {
    let df = load_fixture("pipes.txt");
    assert_eq!(df.width(), 2);
    assert_eq!(df.height(), 3);
}

#[test]
fn test_header_only_file_yields_error_document() {
    let json = run_file("header_only.csv");
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({"error": "Dataset is empty: no rows to analyze"})
    );
}

#[test]
fn test_workbook_first_sheet_is_analyzed() {
    let df = load_fixture("regions.xlsx");
    assert_eq!(df.get_column_names_str(), vec!["region", "units", "price", "note"]);
    assert_eq!(df.height(), 4);

    let report = seeded_analyzer().analyze(&df).unwrap();
    // The blank "note" column counts as numerical, like any column without values.
    assert_eq!(report.dataset_overview.numerical_columns, 3);
    assert_eq!(report.dataset_overview.categorical_columns, 1);
    assert_eq!(report.data_quality_audit.missing.get("note"), Some(4));
    assert!(report.visualizations.iter().any(|v| v.id == "hist_units"));
    assert!(report.visualizations.iter().any(|v| v.id == "cat_region"));
    assert!(!report.visualizations.iter().any(|v| v.id == "hist_note"));
}

#[test]
fn test_unsupported_extension_yields_error_document() {
    let path = fixtures_path().join("report.pdf");
    let err = DatasetLoader::load(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));

    let parsed: Value = serde_json::from_str(&run_file("report.pdf")).unwrap();
    let message = parsed["error"].as_str().unwrap();
    assert!(message.starts_with("Unsupported file format: "));
    assert!(message.ends_with("report.pdf"));
    assert_eq!(parsed.as_object().unwrap().len(), 1);
}
