//! CLI argument definitions for pricemark.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `load` | Import a price CSV into the warehouse |
//! | `average` | Mean price of one slot under any filter |
//! | `benchmark` | Outlier-trimmed mean of one slot for a portfolio |
//! | `aggregate` | Benchmarks over a date range split into N points |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--epoch` | `01/01/2018 00:00:00` | Start of slot 0 |
//! | `--slot-seconds` | `10000` | Slot width |
//! | `--concurrency` | `1` | Aggregate spans looked up at once |
//! | `--db` | `$PRICEMARK_HOME/warehouse.duckdb` | Warehouse file |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! pricemark load prices.csv
//! pricemark benchmark --portfolio p1 --date "03/15/2018 17:33:40" --pretty
//! pricemark aggregate --portfolio p1 --start "01/01/2018 00:00:00" \
//!     --end "01/31/2018 00:00:00" --points 10 --format table
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Time-slot price statistics over a local DuckDB warehouse.
#[derive(Debug, Parser)]
#[command(name = "pricemark", author, version, about)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Start instant of slot 0, in any accepted timestamp format.
    #[arg(long, global = true, default_value = "01/01/2018 00:00:00")]
    pub epoch: String,

    /// Width of one time slot in seconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub slot_seconds: i64,

    /// Aggregate spans looked up concurrently. 1 evaluates them in order.
    #[arg(long, global = true, default_value_t = 1)]
    pub concurrency: usize,

    /// Warehouse database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text for terminal display.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import observations from a CSV file.
    ///
    /// The header must be `portfolio,owner,instrument,date,price`. The import
    /// is skipped when the warehouse already holds data, unless --append.
    ///
    /// # Examples
    ///
    ///   pricemark load prices.csv
    ///   pricemark load more.csv --append
    Load(LoadArgs),

    /// Mean price of the slot containing --date.
    ///
    /// At least one of --portfolio, --owner or --instrument is required.
    Average(AverageArgs),

    /// Outlier-trimmed (1.5 x IQR) mean of the slot containing --date.
    Benchmark(BenchmarkArgs),

    /// Split --start..--end into --points spans and benchmark each.
    ///
    /// Earlier points absorb the remainder slots. Each point is labelled
    /// with the start of its span's last slot.
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// CSV file to import.
    pub file: PathBuf,

    /// Import even when the warehouse already holds observations.
    #[arg(long, default_value_t = false)]
    pub append: bool,
}

#[derive(Debug, Args)]
pub struct AverageArgs {
    /// Instant inside the slot, e.g. "03/15/2018 17:33:40".
    #[arg(long)]
    pub date: String,

    #[arg(long)]
    pub portfolio: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub instrument: Option<String>,
}

#[derive(Debug, Args)]
pub struct BenchmarkArgs {
    /// Instant inside the slot, e.g. "03/15/2018 17:33:40".
    #[arg(long)]
    pub date: String,

    #[arg(long)]
    pub portfolio: Option<String>,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[arg(long)]
    pub portfolio: Option<String>,

    /// First instant of the range.
    #[arg(long)]
    pub start: String,

    /// Last instant of the range; its slot is included.
    #[arg(long)]
    pub end: String,

    /// Number of result points.
    #[arg(long, allow_negative_numbers = true)]
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_aggregate_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pricemark",
            "aggregate",
            "--portfolio",
            "p1",
            "--start",
            "01/01/2018 00:00:00",
            "--end",
            "01/02/2018 00:00:00",
            "--points",
            "3",
            "--concurrency",
            "4",
            "--format",
            "table",
        ])
        .expect("valid arguments");

        assert_eq!(cli.concurrency, 4);
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(matches!(cli.command, Command::Aggregate(ref args) if args.points == 3));
    }

    #[test]
    fn negative_points_reach_validation() {
        let cli = Cli::try_parse_from([
            "pricemark",
            "aggregate",
            "--start",
            "01/01/2018 00:00:00",
            "--end",
            "01/02/2018 00:00:00",
            "--points",
            "-1",
        ])
        .expect("negative numbers are accepted");

        assert!(matches!(cli.command, Command::Aggregate(ref args) if args.points == -1));
    }
}
