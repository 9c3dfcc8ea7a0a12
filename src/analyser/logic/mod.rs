pub mod analysis;
pub mod encoding;
pub mod flows;
pub mod io;
pub mod transforms;
pub mod types;

pub use analysis::{describe_numeric, missing_counts, preview_rows_of, summarize};
pub use flows::{analyze_dataset, apply_operation, prepare_chart};
pub use io::{SourceFormat, load_csv_bytes, load_df, save_df};
pub use transforms::apply;
pub use types::{
    Action, ColumnDescriptor, ColumnKind, MissingCount, NumericSummary, OperationRequest,
    QualityReport, TablePreview, TransformOutcome, describe_columns,
};
