//! Integration tests for the full upload → analyze → transform workflow
//!
//! Each test imports the `testdata/` fixtures into a fresh storage root and
//! drives the same flows the CLI uses.

#![expect(clippy::unwrap_used, clippy::indexing_slicing)]

use polars::prelude::*;
use std::path::Path;
use tidyframe::analyser::logic::{Action, OperationRequest, analyze_dataset, apply_operation};
use tidyframe::analyser::{DatasetHandle, DatasetStore};
use tidyframe::config::StorageConfig;
use tidyframe::error::TidyError;

const SALES: &str = "testdata/sales.csv";

fn store() -> (tempfile::TempDir, DatasetStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new(StorageConfig::with_root(dir.path().join("uploads"))).unwrap();
    (dir, store)
}

fn imported() -> (tempfile::TempDir, DatasetStore, DatasetHandle) {
    let (dir, store) = store();
    let handle = store.import(Path::new(SALES)).unwrap();
    (dir, store, handle)
}

fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    let s = df
        .column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap();
    s.f64().unwrap().into_iter().collect()
}

#[test]
fn test_analyze_sales_csv() {
    let (_dir, store, handle) = imported();
    assert_eq!(handle.name(), "sales.csv");

    let report = analyze_dataset(&store, &handle).unwrap();
    assert_eq!(report.row_count, 7);
    assert_eq!(report.column_count, 4);
    assert_eq!(report.preview.len(), 5);
    assert_eq!(report.total_missing(), 3);
    assert_eq!(report.missing_for("units"), Some(1));
    assert_eq!(report.missing_for("rep"), Some(1));

    let described: Vec<&str> = report.statistics.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(described, vec!["units", "price"]);

    let cleaned = store.cleaned_handle(&handle);
    assert_eq!(cleaned.name(), "cleaned_sales.csv");
    assert!(store.exists(&cleaned));
}

#[test]
fn test_operation_chain_persists() {
    let (_dir, store, handle) = imported();

    let fill = apply_operation(&store, &handle, &OperationRequest::new(Action::Fill)).unwrap();
    assert_eq!(fill.table.column("units").unwrap().null_count(), 0);

    let filtered =
        apply_operation(&store, &handle, &OperationRequest::filter("units", 10.0)).unwrap();
    // 12, 15 (filled mean), 20, 15, 30
    assert_eq!(filtered.table.height(), 5);

    apply_operation(&store, &handle, &OperationRequest::on(Action::Sort, "units")).unwrap();
    let sorted = store.load(&handle).unwrap();
    let units = f64_values(&sorted, "units");
    assert!(units.windows(2).all(|w| w[0] <= w[1]));

    let grouped =
        apply_operation(&store, &handle, &OperationRequest::on(Action::Group, "region")).unwrap();
    let names: Vec<String> = grouped
        .table
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["region", "units", "price"]);
    assert_eq!(f64_values(&grouped.table, "units"), vec![Some(17.5), Some(21.0), Some(15.0)]);

    // The grouped table is what the next request sees
    let reloaded = store.load(&handle).unwrap();
    assert_eq!(reloaded.height(), 3);
    assert_eq!(reloaded.width(), 3);
}

#[test]
fn test_drop_then_analyze_sees_saved_state() {
    let (_dir, store, handle) = imported();

    let outcome = apply_operation(&store, &handle, &OperationRequest::new(Action::Drop)).unwrap();
    assert_eq!(outcome.table.height(), 4);

    let report = analyze_dataset(&store, &handle).unwrap();
    assert_eq!(report.row_count, 4);
    assert_eq!(report.total_missing(), 0);
}

#[test]
fn test_failed_operation_leaves_dataset_unchanged() {
    let (_dir, store, handle) = imported();
    let before = store.download(handle.name()).unwrap();

    let err = apply_operation(&store, &handle, &OperationRequest::filter("rep", 1.0)).unwrap_err();
    assert!(matches!(err, TidyError::InvalidOperation(_)));

    let err = apply_operation(&store, &handle, &OperationRequest::on(Action::Sort, "colour"))
        .unwrap_err();
    assert!(matches!(err, TidyError::InvalidColumn(_)));
    assert!(err.is_client_error());

    assert_eq!(store.download(handle.name()).unwrap(), before);
}

#[test]
fn test_unsupported_upload_is_rejected() {
    let (_dir, store) = store();
    let err = store.import(Path::new("testdata/notes.txt")).unwrap_err();
    assert!(matches!(err, TidyError::UnsupportedFormat(ref ext) if ext == "txt"));
    assert!(!store.root().join("notes.txt").exists());
}

#[test]
fn test_download_is_byte_exact() {
    let (_dir, store, handle) = imported();
    let original = std::fs::read(SALES).unwrap();
    assert_eq!(store.download(handle.name()).unwrap(), original);

    let err = store.download("missing.csv").unwrap_err();
    assert!(matches!(err, TidyError::NotFound(_)));
}

#[test]
fn test_cleaned_snapshot_is_independent() {
    let (_dir, store, handle) = imported();
    analyze_dataset(&store, &handle).unwrap();

    let cleaned = store.cleaned_handle(&handle);
    let snapshot = store.download(cleaned.name()).unwrap();

    apply_operation(&store, &handle, &OperationRequest::new(Action::Drop)).unwrap();
    analyze_dataset(&store, &handle).unwrap();

    // A later analysis does not overwrite the first snapshot
    assert_eq!(store.download(cleaned.name()).unwrap(), snapshot);
    assert_eq!(store.load(&cleaned).unwrap().height(), 7);
    assert_eq!(store.load(&handle).unwrap().height(), 4);
}

#[test]
fn test_unknown_dataset_is_not_found() {
    let (_dir, store) = store();
    let handle = DatasetHandle::new("ghost.csv").unwrap();
    let err = analyze_dataset(&store, &handle).unwrap_err();
    assert!(matches!(err, TidyError::NotFound(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_xlsx_upload_through_the_store() {
    let (_dir, store) = store();
    let handle = store.import(Path::new("testdata/sales.xlsx")).unwrap();

    let report = analyze_dataset(&store, &handle).unwrap();
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["region", "units", "Unnamed: 2", "units.1", "active"]
    );
    let dtypes: Vec<&str> = report.columns.iter().map(|c| c.dtype.as_str()).collect();
    assert_eq!(dtypes, vec!["str", "i64", "str", "f64", "bool"]);
    assert_eq!(report.missing_for("units"), Some(1));
    assert_eq!(report.missing_for("Unnamed: 2"), Some(1));
    assert_eq!(report.total_missing(), 2);

    let described: Vec<&str> = report.statistics.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(described, vec!["units", "units.1"]);

    // Once transformed, the workbook is stored as CSV text and keeps its types
    let outcome =
        apply_operation(&store, &handle, &OperationRequest::filter("units.1", 3.0)).unwrap();
    assert_eq!(outcome.table.height(), 2);
    let reloaded = store.load(&handle).unwrap();
    assert!(reloaded.equals_missing(&outcome.table));
    assert_eq!(reloaded.column("active").unwrap().dtype(), &DataType::Boolean);

    let cleaned = store.load(&store.cleaned_handle(&handle)).unwrap();
    assert_eq!(cleaned.height(), 3);
    assert_eq!(cleaned.column("units").unwrap().dtype(), &DataType::Int64);
}

#[test]
fn test_emptied_table_keeps_numeric_columns() {
    let (_dir, store, handle) = imported();

    let emptied =
        apply_operation(&store, &handle, &OperationRequest::filter("units", 30.0)).unwrap();
    assert_eq!(emptied.table.height(), 0);

    let report = analyze_dataset(&store, &handle).unwrap();
    assert_eq!(report.row_count, 0);
    let described: Vec<&str> = report.statistics.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(described, vec!["units", "price"]);

    let again = apply_operation(&store, &handle, &OperationRequest::filter("units", 1.0)).unwrap();
    assert_eq!(again.table.height(), 0);
}

#[test]
fn test_digit_like_text_survives_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatasetStore::new(StorageConfig::with_root(dir.path())).unwrap();
    let handle = DatasetHandle::new("codes.csv").unwrap();
    store.ingest(&handle, b"code,v\n007,3\nx7,1\n010,2\n").unwrap();

    // After the filter only digit-like codes remain in the saved table
    apply_operation(&store, &handle, &OperationRequest::filter("v", 1.5)).unwrap();
    let outcome =
        apply_operation(&store, &handle, &OperationRequest::on(Action::Sort, "code")).unwrap();

    let table = store.load(&handle).unwrap();
    assert!(table.equals_missing(&outcome.table));
    let codes: Vec<Option<&str>> = table
        .column("code")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(codes, vec![Some("007"), Some("010")]);
}
