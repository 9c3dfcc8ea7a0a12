use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage and loading settings, passed explicitly to the store and loader.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded files and their derived artifacts
    pub root: PathBuf,
    /// Extensions the loader accepts, lowercase and without the dot
    pub allowed_extensions: Vec<String>,
    /// Bytes read from the head of a CSV for encoding detection
    pub sample_bytes: usize,
    /// Rows shown in previews and transform results
    pub preview_rows: usize,
    /// Rows scanned by the CSV reader to infer column types. `None` scans the
    /// whole file.
    pub infer_schema_rows: Option<usize>,
    /// Where rolling log files go. `None` uses the platform data directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            allowed_extensions: vec!["csv".to_owned(), "xls".to_owned(), "xlsx".to_owned()],
            sample_bytes: 100_000,
            preview_rows: 5,
            infer_schema_rows: None,
            log_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Case-insensitive check; accepts `csv`, `.csv`, `CSV`.
    pub fn is_allowed(&self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        self.allowed_extensions
            .iter()
            .any(|allowed| normalize_extension(allowed) == ext)
    }
}

pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Reads a JSON config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<StorageConfig> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(StorageConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config = serde_json::from_str::<StorageConfig>(&content)?;
    Ok(config)
}

pub fn save_config(config: &StorageConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_normalisation() {
        let config = StorageConfig::default();
        assert!(config.is_allowed("csv"));
        assert!(config.is_allowed(".XLSX"));
        assert!(config.is_allowed(" xls "));
        assert!(!config.is_allowed("txt"));
        assert!(!config.is_allowed(""));
    }

    #[test]
    fn test_config_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");

        let mut config = StorageConfig::with_root(dir.path().join("data"));
        config.preview_rows = 10;
        save_config(&config, &path)?;

        let loaded = load_config(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_missing_config_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let loaded = load_config(&dir.path().join("absent.json"))?;
        assert_eq!(loaded, StorageConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_config_fills_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "root": "/srv/tables", "preview_rows": 3 }"#)?;

        let loaded = load_config(&path)?;
        assert_eq!(loaded.root, PathBuf::from("/srv/tables"));
        assert_eq!(loaded.preview_rows, 3);
        assert_eq!(loaded.sample_bytes, 100_000);
        assert_eq!(loaded.infer_schema_rows, None);
        Ok(())
    }
}
