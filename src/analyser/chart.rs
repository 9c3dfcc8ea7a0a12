//! Chart data preparation for an external plot renderer.
//!
//! The renderer itself lives outside this crate. Given a table and a
//! [`PlotRequest`], [`prepare`] checks the column preconditions for the plot
//! kind and reduces the table to exactly the numbers the renderer draws.
//! `Ok(None)` means there is nothing to draw.

use crate::analyser::logic::types::{ColumnKind, column_kind, numeric_column_names};
use crate::error::{Result, TidyError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const HISTOGRAM_BINS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Bar,
    Line,
    Histogram,
    Heatmap,
}

impl FromStr for PlotKind {
    type Err = TidyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "hist" | "histogram" => Ok(Self::Histogram),
            "heatmap" => Ok(Self::Heatmap),
            other => Err(TidyError::InvalidOperation(format!(
                "unknown plot type '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlotRequest {
    pub kind: PlotKind,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl PlotRequest {
    pub fn new(kind: PlotKind, x: Option<&str>, y: Option<&str>) -> Self {
        let clean = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned);
        Self {
            kind,
            x: clean(x),
            y: clean(y),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CategoryPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartData {
    /// Mean of `y` per distinct `x`, in first-appearance order
    Bar {
        x: String,
        y: String,
        points: Vec<CategoryPoint>,
    },
    /// Mean of `y` per distinct `x`, ordered by `x`
    Line {
        x: String,
        y: String,
        points: Vec<CategoryPoint>,
    },
    Histogram {
        column: String,
        bins: Vec<HistogramBin>,
    },
    /// Pearson correlations; `None` where a pair has no variance
    Heatmap {
        columns: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
    },
}

pub fn prepare(df: &DataFrame, request: &PlotRequest) -> Result<Option<ChartData>> {
    match request.kind {
        PlotKind::Bar | PlotKind::Line => {
            let (Some(x), Some(y)) = (request.x.as_deref(), request.y.as_deref()) else {
                return Ok(None);
            };
            column_kind(df, x)?;
            require_numeric(df, y)?;
            let ordered = request.kind == PlotKind::Line;
            let points = mean_by_category(df, x, y, ordered)?;
            let (x, y) = (x.to_owned(), y.to_owned());
            Ok(Some(if ordered {
                ChartData::Line { x, y, points }
            } else {
                ChartData::Bar { x, y, points }
            }))
        }
        PlotKind::Histogram => {
            let Some(x) = request.x.as_deref() else {
                return Ok(None);
            };
            require_numeric(df, x)?;
            Ok(Some(ChartData::Histogram {
                column: x.to_owned(),
                bins: histogram(df, x, HISTOGRAM_BINS)?,
            }))
        }
        PlotKind::Heatmap => {
            let columns = numeric_column_names(df);
            if columns.len() < 2 {
                return Ok(None);
            }
            let matrix = correlation_matrix(df, &columns)?;
            Ok(Some(ChartData::Heatmap { columns, matrix }))
        }
    }
}

fn require_numeric(df: &DataFrame, name: &str) -> Result<()> {
    match column_kind(df, name)? {
        ColumnKind::Numeric => Ok(()),
        ColumnKind::Text => Err(TidyError::InvalidOperation(format!(
            "column '{name}' must be numeric for this plot"
        ))),
    }
}

fn mean_by_category(df: &DataFrame, x: &str, y: &str, ordered: bool) -> Result<Vec<CategoryPoint>> {
    let present = df
        .clone()
        .lazy()
        .filter(col(x).is_not_null().and(col(y).is_not_null()));
    let grouped = if ordered {
        present
            .group_by([col(x)])
            .agg([col(y).mean()])
            .sort_by_exprs(vec![col(x)], SortMultipleOptions::default())
    } else {
        present.group_by_stable([col(x)]).agg([col(y).mean()])
    }
    .collect()?;

    let labels = grouped.column(x)?.as_materialized_series().cast(&DataType::String)?;
    let values = grouped.column(y)?.as_materialized_series().cast(&DataType::Float64)?;

    Ok(labels
        .str()?
        .into_iter()
        .zip(values.f64()?)
        .filter_map(|(label, value)| {
            Some(CategoryPoint {
                label: label?.to_owned(),
                value: value?,
            })
        })
        .collect())
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    column_kind(df, name)?;
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Equal-width bins spanning min..=max. A constant column gets one bin.
pub fn histogram(df: &DataFrame, name: &str, num_bins: usize) -> Result<Vec<HistogramBin>> {
    let values: Vec<f64> = float_values(df, name)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Ok(Vec::new());
    };

    if (max - min).abs() < f64::EPSILON || num_bins == 0 {
        return Ok(vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }]);
    }

    let width = (max - min) / num_bins as f64;
    let mut counts = vec![0_usize; num_bins];
    for v in &values {
        let idx = (((v - min) / width).floor() as usize).min(num_bins - 1);
        if let Some(count) = counts.get_mut(idx) {
            *count += 1;
        }
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count,
        })
        .collect())
}

/// Pearson correlation for every pair of `columns`, using rows where both are
/// present. `None` where a pair has fewer than two such rows or no variance.
pub fn correlation_matrix(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
    for name in columns {
        column_kind(df, name)?;
    }

    let mut matrix = Vec::with_capacity(columns.len());
    for (i, a) in columns.iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for (j, b) in columns.iter().enumerate() {
            if i == j {
                row.push(Some(1.0));
            } else {
                row.push(pairwise_corr(df, a, b)?);
            }
        }
        matrix.push(row);
    }
    Ok(matrix)
}

fn pairwise_corr(df: &DataFrame, a: &str, b: &str) -> Result<Option<f64>> {
    let pairs = df
        .clone()
        .lazy()
        .select([
            col(a).cast(DataType::Float64).alias("a"),
            col(b).cast(DataType::Float64).alias("b"),
        ])
        .drop_nulls(None)
        .collect()?;
    if pairs.height() < 2 {
        return Ok(None);
    }

    let x = pairs.column("a")?.as_materialized_series();
    let y = pairs.column("b")?.as_materialized_series();
    let corr = polars::prelude::cov::pearson_corr(x.f64()?, y.f64()?);
    Ok(corr.filter(|c| c.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> PolarsResult<DataFrame> {
        df!(
            "region" => &["north", "south", "north", "east"],
            "month" => &[3_i64, 1, 2, 1],
            "units" => &[10.0, 4.0, 20.0, 6.0],
            "returns" => &[1.0, 0.4, 2.0, 0.6]
        )
    }

    #[test]
    fn test_bar_means_in_first_appearance_order() -> anyhow::Result<()> {
        let df = sales()?;
        let req = PlotRequest::new(PlotKind::Bar, Some("region"), Some("units"));
        let Some(ChartData::Bar { points, .. }) = prepare(&df, &req)? else {
            anyhow::bail!("expected bar data");
        };
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["north", "south", "east"]);
        assert!((points[0].value - 15.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_line_is_ordered_by_x() -> anyhow::Result<()> {
        let df = sales()?;
        let req = PlotRequest::new(PlotKind::Line, Some("month"), Some("units"));
        let Some(ChartData::Line { points, .. }) = prepare(&df, &req)? else {
            anyhow::bail!("expected line data");
        };
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
        assert!((points[0].value - 5.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_missing_selectors_are_a_no_op() -> anyhow::Result<()> {
        let df = sales()?;
        assert!(prepare(&df, &PlotRequest::new(PlotKind::Bar, Some("region"), None))?.is_none());
        assert!(prepare(&df, &PlotRequest::new(PlotKind::Histogram, Some(""), None))?.is_none());
        Ok(())
    }

    #[test]
    fn test_column_preconditions() -> anyhow::Result<()> {
        let df = sales()?;
        let absent = PlotRequest::new(PlotKind::Histogram, Some("nope"), None);
        assert!(matches!(prepare(&df, &absent), Err(TidyError::InvalidColumn(_))));

        let text_hist = PlotRequest::new(PlotKind::Histogram, Some("region"), None);
        assert!(matches!(
            prepare(&df, &text_hist),
            Err(TidyError::InvalidOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_histogram_counts_every_value() -> anyhow::Result<()> {
        let df = df!("v" => &[Some(0.0), Some(1.0), None, Some(10.0), Some(10.0)])?;
        let bins = histogram(&df, "v", HISTOGRAM_BINS)?;
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(bins.last().map(|b| b.count), Some(2));

        let constant = df!("v" => &[3.0, 3.0])?;
        let bins = histogram(&constant, "v", HISTOGRAM_BINS)?;
        assert_eq!(bins.len(), 1);
        Ok(())
    }

    #[test]
    fn test_heatmap_needs_two_numeric_columns() -> anyhow::Result<()> {
        let narrow = df!("k" => &["a", "b"], "v" => &[1.0, 2.0])?;
        let req = PlotRequest::new(PlotKind::Heatmap, None, None);
        assert!(prepare(&narrow, &req)?.is_none());

        let Some(ChartData::Heatmap { columns, matrix }) = prepare(&sales()?, &req)? else {
            anyhow::bail!("expected heatmap data");
        };
        assert_eq!(columns, vec!["month", "units", "returns"]);
        let units_returns = matrix[1][2].expect("correlation defined");
        assert!((units_returns - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_correlation_skips_missing_pairs_and_constants() -> anyhow::Result<()> {
        let df = df!(
            "a" => &[Some(1.0), Some(2.0), None, Some(4.0)],
            "b" => &[Some(2.0), Some(4.0), Some(100.0), Some(8.0)],
            "flat" => &[5.0, 5.0, 5.0, 5.0]
        )?;
        let columns = vec!["a".to_owned(), "b".to_owned(), "flat".to_owned()];
        let matrix = correlation_matrix(&df, &columns)?;

        // The row with a missing `a` is left out, so a and b are perfectly correlated
        let ab = matrix[0][1].unwrap_or_default();
        assert!((ab - 1.0).abs() < 1e-9);
        assert_eq!(matrix[1][0], matrix[0][1]);
        assert_eq!(matrix[0][2], None);
        assert_eq!(matrix[2][2], Some(1.0));
        Ok(())
    }

    #[test]
    fn test_plot_kind_names() {
        assert_eq!("hist".parse::<PlotKind>().ok(), Some(PlotKind::Histogram));
        assert_eq!("Heatmap".parse::<PlotKind>().ok(), Some(PlotKind::Heatmap));
        assert!("pie".parse::<PlotKind>().is_err());
    }
}
