//! # tidyframe command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Resolve the storage config (file, then --root)
//!   ├─> Initialise logging
//!   └─> Run the subcommand
//! ```
//!
//! ```bash
//! tidyframe import sales.csv
//! tidyframe analyze sales.csv
//! tidyframe apply sales.csv --action filter --column units --threshold 10
//! tidyframe download cleaned_sales.csv
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.storage_config()?;

    let log_dir = tidyframe::logging::init(config.log_dir.as_deref())?;
    tracing::debug!(
        "Writing logs to {}",
        tidyframe::logging::current_log_path(&log_dir).display()
    );
    tracing::debug!("Storage root: {}", config.root.display());

    cli::run_command(cli.command, config)
}
