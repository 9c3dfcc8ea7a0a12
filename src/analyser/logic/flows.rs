//! Request-level workflows: each is one synchronous load → work → save cycle.
//!
//! Nothing here locks a dataset. Two `apply_operation` calls on the same
//! handle may both load the same state, and whichever saves last wins; the
//! other update is lost. Callers that need stronger guarantees must
//! serialise requests per handle themselves.

use super::analysis::summarize;
use super::transforms;
use super::types::{OperationRequest, QualityReport, TransformOutcome};
use crate::analyser::chart::{self, ChartData, PlotRequest};
use crate::analyser::store::{DatasetHandle, DatasetStore};
use crate::error::Result;

/// Loads the current table, summarises it and takes the `cleaned_` snapshot
/// if this is the first analysis since upload.
pub fn analyze_dataset(store: &DatasetStore, handle: &DatasetHandle) -> Result<QualityReport> {
    let df = store.load(handle)?;
    let report = summarize(&df, store.config().preview_rows)?;
    if store.snapshot_cleaned(handle, &df)? {
        tracing::debug!("First analysis of {handle}, snapshot taken");
    }
    Ok(report)
}

/// Applies one operation to the latest stored table and persists the result.
/// On any error the stored table is left as it was.
pub fn apply_operation(
    store: &DatasetStore,
    handle: &DatasetHandle,
    request: &OperationRequest,
) -> Result<TransformOutcome> {
    let df = store.load(handle)?;
    let outcome = transforms::apply(&df, request, store.config().preview_rows).inspect_err(|e| {
        tracing::warn!("Rejected {} on {}: {}", request.action, handle, e);
    })?;
    store.save(handle, &outcome.table)?;
    tracing::info!(
        "Applied {} to {} ({} rows remain)",
        request.action,
        handle,
        outcome.table.height()
    );
    Ok(outcome)
}

pub fn prepare_chart(
    store: &DatasetStore,
    handle: &DatasetHandle,
    request: &PlotRequest,
) -> Result<Option<ChartData>> {
    let df = store.load(handle)?;
    chart::prepare(&df, request)
}
