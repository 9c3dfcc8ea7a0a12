use super::types::{MissingCount, NumericSummary, QualityReport, TablePreview, describe_columns};
use crate::error::Result;
use polars::prelude::*;

/// Builds the preview, numeric statistics and missing-value counts for `df`.
/// The table is not modified. A zero-row table yields empty statistics, not an error.
pub fn summarize(df: &DataFrame, preview_rows: usize) -> Result<QualityReport> {
    Ok(QualityReport {
        row_count: df.height(),
        column_count: df.width(),
        columns: describe_columns(df),
        preview: preview_rows_of(df, preview_rows)?,
        statistics: describe_numeric(df)?,
        missing: missing_counts(df),
    })
}

/// First `n` rows of every column, rendered as text.
pub fn preview_rows_of(df: &DataFrame, n: usize) -> Result<TablePreview> {
    let head = df.head(Some(n));
    let mut columns = Vec::with_capacity(head.width());
    let mut cells_by_column = Vec::with_capacity(head.width());

    for col in head.get_columns() {
        columns.push(col.name().to_string());
        let rendered = col.as_materialized_series().cast(&DataType::String)?;
        let values: Vec<Option<String>> = rendered
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_owned))
            .collect();
        cells_by_column.push(values);
    }

    let rows = (0..head.height())
        .map(|row| {
            cells_by_column
                .iter()
                .map(|cells| cells.get(row).cloned().flatten())
                .collect()
        })
        .collect();

    Ok(TablePreview { columns, rows })
}

/// count / mean / std / min / quartiles / max for numeric columns only.
pub fn describe_numeric(df: &DataFrame) -> Result<Vec<NumericSummary>> {
    let mut summaries = Vec::new();

    for col in df.get_columns() {
        if !col.dtype().is_numeric() {
            continue;
        }
        let series = col.as_materialized_series().cast(&DataType::Float64)?;
        let ca = series.f64()?;

        summaries.push(NumericSummary {
            name: col.name().to_string(),
            count: ca.len() - ca.null_count(),
            mean: ca.mean(),
            std: ca.std(1),
            min: ca.min(),
            q1: ca.quantile(0.25, QuantileMethod::Linear).unwrap_or(None),
            median: ca.quantile(0.5, QuantileMethod::Linear).unwrap_or(None),
            q3: ca.quantile(0.75, QuantileMethod::Linear).unwrap_or(None),
            max: ca.max(),
        });
    }

    Ok(summaries)
}

/// Null count for every column, numeric or not.
pub fn missing_counts(df: &DataFrame) -> Vec<MissingCount> {
    df.get_columns()
        .iter()
        .map(|c| MissingCount {
            name: c.name().to_string(),
            missing: c.null_count(),
        })
        .collect()
}
