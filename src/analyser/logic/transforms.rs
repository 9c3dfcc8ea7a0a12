//! The fixed set of table operations.
//!
//! Each operation takes the current table by reference and produces a new
//! one; the input is never modified. Applying the same request again to its
//! own output is allowed and, for everything except `sort`, may change the
//! data further.

use super::analysis::preview_rows_of;
use super::types::{Action, ColumnKind, OperationRequest, TransformOutcome, column_kind};
use crate::error::{Result, TidyError};
use polars::prelude::*;

/// Validates `request` against `df` and applies it.
///
/// # Errors
///
/// - `InvalidOperation` when a column-based action has no column, `filter`
///   has no threshold, or `filter` targets a non-numeric column
/// - `InvalidColumn` when the named column does not exist
/// - `DataProcessing` when the engine fails
pub fn apply(
    df: &DataFrame,
    request: &OperationRequest,
    preview_rows: usize,
) -> Result<TransformOutcome> {
    let table = match request.action {
        Action::Drop => drop_missing(df)?,
        Action::Fill => fill_missing(df)?,
        Action::Sort => sort_by(df, target_column(request)?)?,
        Action::Filter => {
            let threshold = request.threshold.ok_or_else(|| {
                TidyError::InvalidOperation("filter requires a numeric threshold".to_owned())
            })?;
            filter_greater(df, target_column(request)?, threshold)?
        }
        Action::Group => group_mean(df, target_column(request)?)?,
    };

    tracing::debug!(
        "Applied {} ({} -> {} rows)",
        request.action,
        df.height(),
        table.height()
    );

    let preview = preview_rows_of(&table, preview_rows)?;
    Ok(TransformOutcome { table, preview })
}

fn target_column(request: &OperationRequest) -> Result<&str> {
    request.column.as_deref().ok_or_else(|| {
        TidyError::InvalidOperation(format!("{} requires a column", request.action))
    })
}

fn require_numeric(df: &DataFrame, name: &str, action: Action) -> Result<()> {
    match column_kind(df, name)? {
        ColumnKind::Numeric => Ok(()),
        ColumnKind::Text => Err(TidyError::InvalidOperation(format!(
            "{action} needs a numeric column, '{name}' is text"
        ))),
    }
}

/// Removes every row holding a missing cell in any column.
pub fn drop_missing(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.clone().lazy().drop_nulls(None).collect()?)
}

/// Replaces missing cells of numeric columns with that column's mean.
/// Text columns keep their missing cells.
pub fn fill_missing(df: &DataFrame) -> Result<DataFrame> {
    let fills: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric() && c.null_count() > 0)
        .map(|c| {
            let expr = col(c.name().as_str());
            expr.clone().fill_null(expr.mean())
        })
        .collect();

    if fills.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(fills).collect()?)
}

/// Stable ascending sort; missing keys go last.
pub fn sort_by(df: &DataFrame, column: &str) -> Result<DataFrame> {
    column_kind(df, column)?;
    Ok(df
        .clone()
        .lazy()
        .sort_by_exprs(
            vec![col(column)],
            SortMultipleOptions::default()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )
        .collect()?)
}

/// Keeps rows whose `column` value is strictly greater than `threshold`.
/// Rows with a missing value are dropped.
pub fn filter_greater(df: &DataFrame, column: &str, threshold: f64) -> Result<DataFrame> {
    require_numeric(df, column, Action::Filter)?;
    Ok(df
        .clone()
        .lazy()
        .filter(col(column).gt(lit(threshold)))
        .collect()?)
}

/// One row per distinct non-missing value of `column`, ascending, with the
/// mean of every other numeric column.
pub fn group_mean(df: &DataFrame, column: &str) -> Result<DataFrame> {
    column_kind(df, column)?;

    let aggregates: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric() && c.name().as_str() != column)
        .map(|c| col(c.name().as_str()).mean())
        .collect();

    Ok(df
        .clone()
        .lazy()
        .filter(col(column).is_not_null())
        .group_by([col(column)])
        .agg(aggregates)
        .sort_by_exprs(
            vec![col(column)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?)
}
