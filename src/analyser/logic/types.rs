use crate::error::{Result, TidyError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// COLUMN MODEL

/// Coarse column type, fixed by the dtype chosen when the table was loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            Self::Numeric
        } else {
            Self::Text
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Text => "Text",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Engine dtype, e.g. `i64`, `f64`, `str`
    pub dtype: String,
}

/// Lists every column of `df` in order with its kind.
pub fn describe_columns(df: &DataFrame) -> Vec<ColumnDescriptor> {
    df.get_columns()
        .iter()
        .map(|c| ColumnDescriptor {
            name: c.name().to_string(),
            kind: ColumnKind::of(c.dtype()),
            dtype: c.dtype().to_string(),
        })
        .collect()
}

/// Looks up `name` and returns its kind, or `InvalidColumn`.
pub fn column_kind(df: &DataFrame, name: &str) -> Result<ColumnKind> {
    df.get_column_index(name)
        .and_then(|idx| df.get_columns().get(idx))
        .map(|c| ColumnKind::of(c.dtype()))
        .ok_or_else(|| TidyError::InvalidColumn(name.to_owned()))
}

pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

// QUALITY REPORT

/// Rows rendered as text, `None` marking a missing cell.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TablePreview {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// describe()-style statistics for one numeric column.
/// Every figure is `None` when the column holds no values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NumericSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MissingCount {
    pub name: String,
    pub missing: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnDescriptor>,
    pub preview: TablePreview,
    pub statistics: Vec<NumericSummary>,
    pub missing: Vec<MissingCount>,
}

impl QualityReport {
    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|m| m.missing).sum()
    }

    pub fn missing_for(&self, name: &str) -> Option<usize> {
        self.missing
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.missing)
    }
}

// OPERATIONS

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Remove rows with any missing cell
    Drop,
    /// Replace missing numeric cells with the column mean
    Fill,
    /// Stable ascending sort on one column
    Sort,
    /// Keep rows where a numeric column exceeds a threshold
    Filter,
    /// One row per distinct key with the mean of each numeric column
    Group,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Fill => "fill",
            Self::Sort => "sort",
            Self::Filter => "filter",
            Self::Group => "group",
        }
    }

    pub fn needs_column(self) -> bool {
        matches!(self, Self::Sort | Self::Filter | Self::Group)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TidyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "fill" => Ok(Self::Fill),
            "sort" => Ok(Self::Sort),
            "filter" => Ok(Self::Filter),
            "group" => Ok(Self::Group),
            other => Err(TidyError::InvalidOperation(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct OperationRequest {
    pub action: Action,
    pub column: Option<String>,
    pub threshold: Option<f64>,
}

impl OperationRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            column: None,
            threshold: None,
        }
    }

    pub fn on(action: Action, column: impl Into<String>) -> Self {
        Self {
            action,
            column: Some(column.into()),
            threshold: None,
        }
    }

    pub fn filter(column: impl Into<String>, threshold: f64) -> Self {
        Self {
            action: Action::Filter,
            column: Some(column.into()),
            threshold: Some(threshold),
        }
    }

    /// Builds a request from raw form-style fields. Blank strings count as absent,
    /// and a column given to `drop` or `fill` is ignored.
    pub fn parse(action: &str, column: Option<&str>, threshold: Option<&str>) -> Result<Self> {
        let action = action.parse::<Action>()?;
        let column = column
            .map(str::trim)
            .filter(|c| action.needs_column() && !c.is_empty())
            .map(str::to_owned);
        let threshold = match threshold.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => Some(raw.parse::<f64>().map_err(|e| {
                TidyError::InvalidOperation(format!("threshold '{raw}' is not a number: {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            action,
            column,
            threshold,
        })
    }
}

/// Result of a transform: the full new table plus its first rows.
#[derive(Clone, Debug)]
pub struct TransformOutcome {
    pub table: DataFrame,
    pub preview: TablePreview,
}
