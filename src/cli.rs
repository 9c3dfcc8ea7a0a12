use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tidyframe::analyser::logic::{self, OperationRequest, QualityReport, TablePreview};
use tidyframe::analyser::{DatasetHandle, DatasetStore, PlotKind, PlotRequest};
use tidyframe::config::{StorageConfig, load_config};
use tidyframe::utils::{fmt_cell, fmt_opt};

#[derive(Parser)]
#[command(
    name = "tidyframe",
    about = "Inspect, clean and chart uploaded CSV and spreadsheet files"
)]
pub struct Cli {
    /// Storage root for uploads and derived files (overrides the config file)
    #[arg(long, global = true, env = "TIDYFRAME_ROOT")]
    pub root: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(long, global = true, env = "TIDYFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn storage_config(&self) -> Result<StorageConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StorageConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy a CSV or spreadsheet into the storage root
    Import {
        /// File to import
        file: PathBuf,
    },
    /// Show preview, statistics and missing values for a dataset
    Analyze {
        /// Dataset name (the uploaded file name)
        name: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply one operation and save the result over the dataset
    Apply {
        name: String,

        /// drop, fill, sort, filter or group
        #[arg(short, long)]
        action: String,

        /// Target column (sort, filter, group)
        #[arg(short, long)]
        column: Option<String>,

        /// Lower bound, exclusive (filter)
        #[arg(short, long)]
        threshold: Option<String>,
    },
    /// Produce chart data as JSON for a renderer
    Chart {
        name: String,

        /// bar, line, hist or heatmap
        #[arg(short, long)]
        kind: String,

        #[arg(short)]
        x: Option<String>,

        #[arg(short)]
        y: Option<String>,
    },
    /// Write a stored file (dataset or cleaned snapshot) byte for byte
    Download {
        name: String,

        /// Destination; defaults to the dataset name in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run_command(command: Commands, config: StorageConfig) -> Result<()> {
    let store = DatasetStore::new(config)?;

    match command {
        Commands::Import { file } => {
            let handle = store.import(&file)?;
            println!("Imported {handle}");
        }
        Commands::Analyze { name, json } => {
            let handle = DatasetHandle::new(name)?;
            let report = logic::analyze_dataset(&store, &handle)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&handle, &report);
            }
        }
        Commands::Apply {
            name,
            action,
            column,
            threshold,
        } => {
            let handle = DatasetHandle::new(name)?;
            let request = OperationRequest::parse(&action, column.as_deref(), threshold.as_deref())?;
            let outcome = logic::apply_operation(&store, &handle, &request)?;
            println!(
                "{} applied to {handle}: {} rows x {} columns",
                request.action,
                outcome.table.height(),
                outcome.table.width()
            );
            print_preview(&outcome.preview);
        }
        Commands::Chart { name, kind, x, y } => {
            let handle = DatasetHandle::new(name)?;
            let request = PlotRequest::new(kind.parse::<PlotKind>()?, x.as_deref(), y.as_deref());
            match logic::prepare_chart(&store, &handle, &request)? {
                Some(chart) => println!("{}", serde_json::to_string_pretty(&chart)?),
                None => println!("Nothing to plot for the given columns"),
            }
        }
        Commands::Download { name, output } => {
            let bytes = store.download(&name)?;
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
    }
    Ok(())
}

fn print_report(handle: &DatasetHandle, report: &QualityReport) {
    println!(
        "{handle}: {} rows x {} columns\n",
        report.row_count, report.column_count
    );

    println!("Columns");
    for c in &report.columns {
        println!("  {:<20} {:<8} {}", c.name, c.kind.as_str(), c.dtype);
    }

    println!("\nPreview");
    print_preview(&report.preview);

    println!("\nStatistics");
    if report.statistics.is_empty() {
        println!("  (no numeric columns)");
    }
    for s in &report.statistics {
        println!(
            "  {:<20} count {:<6} mean {:<10} std {:<10} min {:<10} 25% {:<10} 50% {:<10} 75% {:<10} max {}",
            s.name,
            s.count,
            fmt_opt(s.mean),
            fmt_opt(s.std),
            fmt_opt(s.min),
            fmt_opt(s.q1),
            fmt_opt(s.median),
            fmt_opt(s.q3),
            fmt_opt(s.max)
        );
    }

    println!("\nMissing values");
    for m in &report.missing {
        println!("  {:<20} {}", m.name, m.missing);
    }
}

fn print_preview(preview: &TablePreview) {
    println!("  {}", preview.columns.join(" | "));
    for row in &preview.rows {
        let cells: Vec<&str> = row.iter().map(|c| fmt_cell(c.as_deref())).collect();
        println!("  {}", cells.join(" | "));
    }
}
