//! # tidyframe - tabular data ingestion and transformation
//!
//! tidyframe loads an uploaded CSV or spreadsheet, reports its shape and
//! quality, and applies a fixed set of cleaning operations to a dataset that
//! persists between requests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tidyframe::analyser::logic::{self, Action, OperationRequest};
//! use tidyframe::analyser::{DatasetHandle, DatasetStore};
//! use tidyframe::config::StorageConfig;
//!
//! # fn example() -> tidyframe::error::Result<()> {
//! let store = DatasetStore::new(StorageConfig::with_root("uploads"))?;
//! let handle = store.import("sales.csv".as_ref())?;
//!
//! let report = logic::analyze_dataset(&store, &handle)?;
//! println!("{} rows, {} missing cells", report.row_count, report.total_missing());
//!
//! // Each operation rewrites the stored dataset
//! logic::apply_operation(&store, &handle, &OperationRequest::new(Action::Drop))?;
//! logic::apply_operation(&store, &handle, &OperationRequest::filter("units", 10.0))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser::logic`]: encoding detection, loading, summaries and transforms
//! - [`analyser::store`]: the persisted dataset state
//! - [`analyser::chart`]: chart data for an external renderer
//! - [`config`]: storage settings, passed explicitly
//! - [`error`]: the error taxonomy
//! - [`logging`]: tracing setup

#![warn(clippy::all, rust_2018_idioms)]

pub mod analyser;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
