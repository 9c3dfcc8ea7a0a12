//! Dataset ingestion, quality summaries, transforms and persistence.

pub mod chart;
pub mod logic;
pub mod store;

pub use chart::{ChartData, PlotKind, PlotRequest};
pub use store::{DatasetHandle, DatasetStore};
