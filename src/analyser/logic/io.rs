use super::encoding;
use crate::config::{StorageConfig, normalize_extension};
use crate::error::{Result, TidyError};
use calamine::{Data, Reader as _, open_workbook_auto};
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xls,
    Xlsx,
}

impl SourceFormat {
    /// Maps an extension (with or without the dot) to a format, rejecting
    /// anything outside `config.allowed_extensions`.
    pub fn from_extension(ext: &str, config: &StorageConfig) -> Result<Self> {
        let ext = normalize_extension(ext);
        if !config.is_allowed(&ext) {
            return Err(TidyError::UnsupportedFormat(ext));
        }
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xls" => Ok(Self::Xls),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(TidyError::UnsupportedFormat(ext)),
        }
    }

    pub fn is_spreadsheet(self) -> bool {
        matches!(self, Self::Xls | Self::Xlsx)
    }
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Loads the file at `path`, whose format is given by `ext`.
pub fn load_df(path: &Path, ext: &str, config: &StorageConfig) -> Result<DataFrame> {
    let format = SourceFormat::from_extension(ext, config)?;
    load_with_format(path, format, config)
}

pub fn load_with_format(
    path: &Path,
    format: SourceFormat,
    config: &StorageConfig,
) -> Result<DataFrame> {
    let df = match format {
        SourceFormat::Csv => {
            let bytes = std::fs::read(path)?;
            load_csv_bytes(&bytes, config)?
        }
        SourceFormat::Xls | SourceFormat::Xlsx => load_spreadsheet(path)?,
    };
    tracing::debug!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Parses CSV bytes, detecting the encoding from the first
/// `config.sample_bytes` bytes.
pub fn load_csv_bytes(bytes: &[u8], config: &StorageConfig) -> Result<DataFrame> {
    let sample_len = bytes.len().min(config.sample_bytes);
    let sample = bytes.get(..sample_len).unwrap_or(bytes);
    let detected = encoding::detect(sample, sample_len == bytes.len()).ok_or_else(|| {
        TidyError::Parse("could not detect a text encoding (file is empty)".to_owned())
    })?;

    let body = bytes.get(detected.bom_len..).unwrap_or_default();
    let text = detected
        .encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            TidyError::Parse(format!(
                "content is not valid {} text",
                detected.label()
            ))
        })?;

    parse_csv_text(text.as_bytes(), config.infer_schema_rows, None)
        .map_err(|e| TidyError::Parse(format!("{e} (encoding {})", detected.label())))
}

/// Parses a table the store wrote itself. Those files are always UTF-8, and
/// `schema`, when given, pins every column to the dtype it had when saved.
pub fn load_stored_csv(bytes: &[u8], schema: Option<SchemaRef>) -> Result<DataFrame> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TidyError::Parse(format!("stored table is not UTF-8: {e}")))?;
    parse_csv_text(text.as_bytes(), None, schema).map_err(|e| TidyError::Parse(e.to_string()))
}

fn parse_csv_text(
    text: &[u8],
    infer_rows: Option<usize>,
    schema: Option<SchemaRef>,
) -> PolarsResult<DataFrame> {
    let labels = csv_header_labels(text)?;
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_rows)
        .with_schema(schema)
        .into_reader_with_file_handle(Cursor::new(text))
        .finish()?;

    if labels.len() == df.width() {
        df.set_column_names(labels)?;
    }
    Ok(df)
}

/// Raw header cells of a CSV, relabelled the same way as spreadsheet headers.
fn csv_header_labels(text: &[u8]) -> PolarsResult<Vec<String>> {
    let header = CsvReadOptions::default()
        .with_has_header(false)
        .with_n_rows(Some(1))
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text))
        .finish()?;

    let raw = header.get_columns().iter().map(|c| {
        c.as_materialized_series()
            .str()
            .ok()
            .and_then(|ca| ca.get(0))
            .map(str::to_owned)
    });
    Ok(unique_labels(raw))
}

static EMPTY_CELL: Data = Data::Empty;

/// Reads the first worksheet. Row one is the header.
pub fn load_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| TidyError::Parse(format!("spreadsheet: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TidyError::Parse("workbook has no worksheets".to_owned()))?
        .map_err(|e| TidyError::Parse(format!("spreadsheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names = unique_labels(header.iter().map(|cell| match cell {
        Data::Empty => None,
        other => Some(other.to_string()),
    }));
    let body: Vec<&[Data]> = rows.collect();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
                .collect();
            Column::from(cells_to_series(name, &cells))
        })
        .collect::<Vec<_>>();

    DataFrame::new(columns).map_err(|e| TidyError::Parse(e.to_string()))
}

/// Blank labels become `Unnamed: <i>`; repeats get `.1`, `.2`, ...
fn unique_labels(raw: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, label)| {
            let base = match label {
                Some(text) if !text.trim().is_empty() => text,
                _ => format!("Unnamed: {idx}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// Largest magnitude an f64 cell may have and still be read as an integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn is_integral(cell: &Data) -> bool {
    match cell {
        Data::Int(_) => true,
        Data::Float(v) => v.fract() == 0.0 && v.abs() < MAX_EXACT_INT,
        _ => false,
    }
}

/// Types a spreadsheet column from its cells: all whole numbers → i64, all
/// numbers → f64, all booleans → bool, otherwise text. Empty and error cells
/// are null. xlsx stores every number as a float, so `12.0` counts as whole.
fn cells_to_series(name: String, cells: &[&Data]) -> Series {
    let present = || {
        cells
            .iter()
            .filter(|c| !matches!(c, Data::Empty | Data::Error(_)))
    };

    if present().all(is_integral) && present().next().is_some() {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(v) => Some(*v),
                Data::Float(v) => Some(*v as i64),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if present().all(|c| matches!(c, Data::Int(_) | Data::Float(_))) && present().next().is_some()
    {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(v) => Some(*v as f64),
                Data::Float(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if present().all(|c| matches!(c, Data::Bool(_))) && present().next().is_some() {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| match c {
            Data::Empty | Data::Error(_) => None,
            Data::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    Series::new(name.into(), values)
}

/// Writes `df` as CSV text with a header row.
pub fn save_df(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| TidyError::DataProcessing(format!("Failed to write CSV: {e}")))?;
    Ok(())
}

/// Stable text tag for the dtypes the loaders produce, used to persist a
/// table's schema next to its CSV text.
pub fn dtype_tag(dtype: &DataType) -> Option<&'static str> {
    match dtype {
        DataType::Int32 => Some("i32"),
        DataType::Int64 => Some("i64"),
        DataType::UInt32 => Some("u32"),
        DataType::UInt64 => Some("u64"),
        DataType::Float32 => Some("f32"),
        DataType::Float64 => Some("f64"),
        DataType::Boolean => Some("bool"),
        DataType::String => Some("str"),
        _ => None,
    }
}

pub fn dtype_from_tag(tag: &str) -> Option<DataType> {
    match tag {
        "i32" => Some(DataType::Int32),
        "i64" => Some(DataType::Int64),
        "u32" => Some(DataType::UInt32),
        "u64" => Some(DataType::UInt64),
        "f32" => Some(DataType::Float32),
        "f64" => Some(DataType::Float64),
        "bool" => Some(DataType::Boolean),
        "str" => Some(DataType::String),
        _ => None,
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Whether `bytes` start with an xlsx (zip) or xls (OLE) signature.
pub fn has_spreadsheet_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}
