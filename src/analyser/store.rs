//! Persistent dataset state, keyed by upload filename.
//!
//! Each dataset owns two files under the storage root:
//! - `<name>`: the canonical table, overwritten by every successful transform
//! - `cleaned_<name>`: a snapshot written the first time the dataset is analysed
//!
//! Both are CSV text once written by the store, with each column's dtype kept
//! in `.schema/<name>.json` so a reload gives back the same types.
//!
//! There is no locking. Two writers on the same handle race and the last
//! `save` wins.

use crate::analyser::logic::io::{
    SourceFormat, dtype_from_tag, dtype_tag, extension_of, has_spreadsheet_signature,
    load_stored_csv, load_with_format, save_df,
};
use crate::config::StorageConfig;
use crate::error::{Result, ResultExt as _, TidyError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CLEANED_PREFIX: &str = "cleaned_";

const SCHEMA_DIR: &str = ".schema";

/// Stable name of a dataset inside the storage root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatasetHandle {
    name: String,
}

impl DatasetHandle {
    /// Rejects empty names and anything that could leave the storage root.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TidyError::InvalidPath("dataset name is empty".to_owned()));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed.contains("..") {
            return Err(TidyError::InvalidPath(format!(
                "'{trimmed}' is not a plain file name"
            )));
        }
        Ok(Self {
            name: trimmed.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> String {
        extension_of(Path::new(&self.name))
    }

    pub fn is_cleaned(&self) -> bool {
        self.name.starts_with(CLEANED_PREFIX)
    }
}

impl std::fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    config: StorageConfig,
}

impl DatasetStore {
    pub fn new(config: StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)
            .with_context(|| format!("Failed to create storage root {}", config.root.display()))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn path_for(&self, handle: &DatasetHandle) -> PathBuf {
        self.config.root.join(handle.name())
    }

    pub fn cleaned_handle(&self, handle: &DatasetHandle) -> DatasetHandle {
        DatasetHandle {
            name: format!("{CLEANED_PREFIX}{}", handle.name()),
        }
    }

    pub fn exists(&self, handle: &DatasetHandle) -> bool {
        self.path_for(handle).is_file()
    }

    /// Copies an uploaded file into the root under its own file name.
    pub fn import(&self, source: &Path) -> Result<DatasetHandle> {
        let name = source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TidyError::InvalidPath(format!("{} has no file name", source.display())))?;
        let handle = DatasetHandle::new(name)?;
        let bytes = fs::read(source)
            .with_context(|| format!("Failed to read upload {}", source.display()))?;
        self.ingest(&handle, &bytes)?;
        Ok(handle)
    }

    /// Stores raw upload bytes under `handle`. The name and extension are
    /// checked first so rejected uploads never reach disk. A stale cleaned
    /// snapshot from an earlier upload with the same name is removed.
    pub fn ingest(&self, handle: &DatasetHandle, bytes: &[u8]) -> Result<()> {
        if handle.is_cleaned() {
            return Err(TidyError::InvalidPath(format!(
                "'{handle}' uses the reserved {CLEANED_PREFIX} prefix"
            )));
        }
        SourceFormat::from_extension(&handle.extension(), &self.config)?;
        fs::write(self.path_for(handle), bytes)
            .with_context(|| format!("Failed to store upload {handle}"))?;
        self.remove_schema(handle)?;

        let cleaned = self.cleaned_handle(handle);
        let cleaned_path = self.path_for(&cleaned);
        if cleaned_path.exists() {
            fs::remove_file(&cleaned_path)?;
        }
        self.remove_schema(&cleaned)?;
        tracing::info!("Stored upload {} ({} bytes)", handle, bytes.len());
        Ok(())
    }

    /// Reads the latest saved table for `handle`.
    ///
    /// A table the store has written comes back with the dtypes it was saved
    /// with. A raw upload is typed by the loader.
    pub fn load(&self, handle: &DatasetHandle) -> Result<DataFrame> {
        let path = self.path_for(handle);
        if !path.is_file() {
            return Err(TidyError::NotFound(handle.name().to_owned()));
        }
        if let Some(columns) = self.read_schema(handle)? {
            let bytes = fs::read(&path)?;
            return load_stored_csv(&bytes, schema_of(&columns));
        }
        let format = self.stored_format(handle, &path)?;
        load_with_format(&path, format, &self.config)
    }

    /// A spreadsheet-named file without a workbook signature is CSV text.
    fn stored_format(&self, handle: &DatasetHandle, path: &Path) -> Result<SourceFormat> {
        let format = SourceFormat::from_extension(&handle.extension(), &self.config)?;
        if !format.is_spreadsheet() {
            return Ok(format);
        }
        let mut head = [0_u8; 8];
        let read = {
            use std::io::Read as _;
            let mut file = fs::File::open(path)?;
            file.read(&mut head)?
        };
        if has_spreadsheet_signature(head.get(..read).unwrap_or_default()) {
            Ok(format)
        } else {
            Ok(SourceFormat::Csv)
        }
    }

    /// Overwrites the canonical table for `handle`.
    pub fn save(&self, handle: &DatasetHandle, df: &DataFrame) -> Result<()> {
        self.write_table(handle, df)?;
        tracing::info!(
            "Saved {} ({} rows x {} columns)",
            handle,
            df.height(),
            df.width()
        );
        Ok(())
    }

    /// Writes the `cleaned_` snapshot unless one already exists.
    /// Returns whether a snapshot was written.
    pub fn snapshot_cleaned(&self, handle: &DatasetHandle, df: &DataFrame) -> Result<bool> {
        let cleaned = self.cleaned_handle(handle);
        if self.exists(&cleaned) {
            return Ok(false);
        }
        self.write_table(&cleaned, df)?;
        tracing::info!("Wrote snapshot {}", cleaned);
        Ok(true)
    }

    /// Raw bytes of any stored artifact, exactly as on disk.
    pub fn download(&self, name: &str) -> Result<Vec<u8>> {
        let handle = DatasetHandle::new(name)?;
        let path = self.path_for(&handle);
        if !path.is_file() {
            return Err(TidyError::NotFound(handle.name().to_owned()));
        }
        Ok(fs::read(path)?)
    }

    fn write_table(&self, handle: &DatasetHandle, df: &DataFrame) -> Result<()> {
        let mut df = df.clone();
        save_df(&mut df, &self.path_for(handle))?;

        let columns: Vec<StoredColumn> = df
            .get_columns()
            .iter()
            .map(|c| StoredColumn {
                name: c.name().to_string(),
                dtype: dtype_tag(c.dtype()).map(str::to_owned),
            })
            .collect();
        let path = self.schema_path(handle);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(&columns)?)
            .with_context(|| format!("Failed to write schema for {handle}"))?;
        Ok(())
    }

    /// Schema files live in a dot-directory, which no dataset name can reach.
    fn schema_path(&self, handle: &DatasetHandle) -> PathBuf {
        self.config
            .root
            .join(SCHEMA_DIR)
            .join(format!("{}.json", handle.name()))
    }

    fn read_schema(&self, handle: &DatasetHandle) -> Result<Option<Vec<StoredColumn>>> {
        let path = self.schema_path(handle);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn remove_schema(&self, handle: &DatasetHandle) -> Result<()> {
        let path = self.schema_path(handle);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Column name and dtype tag as persisted next to a saved table.
#[derive(Debug, Serialize, Deserialize)]
struct StoredColumn {
    name: String,
    dtype: Option<String>,
}

/// Full schema when every column has a known dtype, otherwise `None` and the
/// reader infers.
fn schema_of(columns: &[StoredColumn]) -> Option<SchemaRef> {
    let fields = columns
        .iter()
        .map(|c| {
            let dtype = c.dtype.as_deref().and_then(dtype_from_tag)?;
            Some(Field::new(c.name.as_str().into(), dtype))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Arc::new(Schema::from_iter(fields)))
}
