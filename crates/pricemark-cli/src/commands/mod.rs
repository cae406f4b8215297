mod aggregate;
mod average;
mod benchmark;
mod load;

use std::time::Instant;

use pricemark_core::{
    CoreError, Envelope, EnvelopeError, PriceReporter, ReporterConfig, RequestValidator,
    SlotClock, SlotClockConfig, StatResult, UtcDateTime,
};
use pricemark_warehouse::{Warehouse, WarehouseConfig};
use serde::Serialize;
use serde_json::Value;
use time::Duration;
use tracing::{debug, warn};

use crate::cli::{Cli, Command};
use crate::error::{exit_code_for, CliError};
use crate::metadata::Metadata;

const SCHEMA_VERSION: &str = "v1.0.0";

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Rendered envelope plus the process exit code it implies.
pub struct Outcome {
    pub envelope: Envelope<Value>,
    pub exit_code: u8,
}

#[derive(Debug, Serialize)]
struct SingleSlotResponseData {
    slot: i64,
    point: StatResult,
}

/// Runs the selected command.
///
/// Reporting failures become a failure envelope (`data: null`) with the
/// matching exit code. Anything else, such as an unreadable warehouse file,
/// is returned as an error.
pub async fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let started = Instant::now();
    let result = dispatch(cli).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(CommandResult { data, warnings }) => {
            let mut metadata = Metadata::new(latency_ms);
            for warning in warnings {
                metadata.push_warning(warning);
            }
            let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;
            Ok(Outcome {
                envelope: Envelope::success(meta, data),
                exit_code: 0,
            })
        }
        Err(CliError::Core(error)) => {
            warn!(code = error.code(), %error, "command failed");
            let meta = Metadata::new(latency_ms).into_envelope_meta(SCHEMA_VERSION)?;
            let envelope = Envelope::failure(meta, vec![EnvelopeError::from(&error)])?;
            Ok(Outcome {
                envelope,
                exit_code: exit_code_for(error.kind()),
            })
        }
        Err(error) => Err(error),
    }
}

async fn dispatch(cli: &Cli) -> Result<CommandResult, CliError> {
    let context = Context {
        cli,
        validator: RequestValidator::new(slot_clock(cli)?),
    };

    match &cli.command {
        Command::Load(args) => load::run(args, &context),
        Command::Average(args) => average::run(args, &context).await,
        Command::Benchmark(args) => benchmark::run(args, &context).await,
        Command::Aggregate(args) => aggregate::run(args, &context).await,
    }
}

/// Shared command inputs. The warehouse is only opened once a request has
/// passed validation, so rejected input never creates the database file.
pub struct Context<'a> {
    cli: &'a Cli,
    validator: RequestValidator,
}

impl Context<'_> {
    pub const fn validator(&self) -> &RequestValidator {
        &self.validator
    }

    pub fn open_warehouse(&self) -> Result<Warehouse, CliError> {
        let config = match &self.cli.db {
            Some(path) => WarehouseConfig::with_db_path(path),
            None => WarehouseConfig::default(),
        };
        let warehouse = Warehouse::open(config)?;
        debug!(db = %warehouse.db_path().display(), "warehouse opened");
        Ok(warehouse)
    }

    pub fn reporter(&self) -> Result<PriceReporter<Warehouse>, CliError> {
        Ok(PriceReporter::with_config(
            *self.validator.clock(),
            self.open_warehouse()?,
            ReporterConfig {
                max_concurrency: self.cli.concurrency,
            },
        ))
    }
}

fn slot_clock(cli: &Cli) -> Result<SlotClock, CoreError> {
    let config = SlotClockConfig {
        epoch: UtcDateTime::parse(&cli.epoch)?,
        slot_duration: Duration::seconds(cli.slot_seconds),
    };
    Ok(SlotClock::new(config)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    const PRICES: &str = "portfolio,owner,instrument,date,price\n\
                          p1,o1,bond,01/01/2018 00:10:00,1\n\
                          p1,o2,bond,01/01/2018 00:20:00,2\n\
                          p1,o1,bond,01/01/2018 03:00:00,3\n\
                          p1,o1,swap,01/01/2018 03:10:00,4\n\
                          p2,o1,bond,01/01/2018 00:30:00,50\n";

    fn cli(db: &Path, args: &[&str]) -> Cli {
        let db = db.display().to_string();
        let mut argv = vec!["pricemark", "--db", db.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    async fn loaded_db(dir: &Path) -> std::path::PathBuf {
        let csv = dir.join("prices.csv");
        fs::write(&csv, PRICES).expect("write csv");
        let db = dir.join("warehouse.duckdb");
        let outcome = run(&cli(&db, &["load", csv.to_str().expect("utf-8 path")]))
            .await
            .expect("load runs");
        assert_eq!(outcome.exit_code, 0);
        db
    }

    #[tokio::test]
    async fn load_then_benchmark_reports_slot_point() {
        let temp = tempdir().expect("tempdir");
        let db = loaded_db(temp.path()).await;

        let outcome = run(&cli(
            &db,
            &["benchmark", "--portfolio", "p1", "--date", "01/01/2018 01:00:00"],
        ))
        .await
        .expect("benchmark runs");

        assert_eq!(outcome.exit_code, 0);
        let data = outcome.envelope.data.expect("success carries data");
        assert_eq!(data["slot"], 0);
        assert_eq!(data["point"]["start"], "2018-01-01T00:00:00Z");
        assert_eq!(data["point"]["price"], "2");
    }

    #[tokio::test]
    async fn second_load_is_skipped_with_warning() {
        let temp = tempdir().expect("tempdir");
        let db = loaded_db(temp.path()).await;
        let csv = temp.path().join("prices.csv");

        let outcome = run(&cli(&db, &["load", csv.to_str().expect("utf-8 path")]))
            .await
            .expect("load runs");

        let data = outcome.envelope.data.expect("success carries data");
        assert_eq!(data["skipped"], true);
        assert_eq!(outcome.envelope.meta.warnings.len(), 1);
    }

    #[tokio::test]
    async fn empty_slot_yields_failure_envelope_with_date() {
        let temp = tempdir().expect("tempdir");
        let db = loaded_db(temp.path()).await;

        let outcome = run(&cli(
            &db,
            &["average", "--owner", "o9", "--date", "01/01/2018 00:00:00"],
        ))
        .await
        .expect("failure is reported in the envelope");

        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.envelope.data.is_none());
        assert_eq!(outcome.envelope.errors[0].code, "report.no_data");
        assert!(outcome.envelope.errors[0].date.is_some());
    }

    #[tokio::test]
    async fn malformed_date_exits_as_caller_error() {
        let temp = tempdir().expect("tempdir");
        let db = temp.path().join("warehouse.duckdb");

        let outcome = run(&cli(&db, &["benchmark", "--portfolio", "p1", "--date", "soon"]))
            .await
            .expect("failure is reported in the envelope");

        assert_eq!(outcome.exit_code, 2);
        assert_eq!(outcome.envelope.errors[0].code, "request.format");
        assert!(!db.exists(), "rejected requests must not create the warehouse");
    }

    #[tokio::test]
    async fn missing_csv_file_leaves_no_warehouse_behind() {
        let temp = tempdir().expect("tempdir");
        let db = temp.path().join("data").join("warehouse.duckdb");
        let missing = temp.path().join("absent.csv");

        let error = run(&cli(&db, &["load", missing.to_str().expect("utf-8 path")]))
            .await
            .err()
            .expect("unreadable file is an error");

        assert_eq!(error.exit_code(), 10);
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn aggregate_splits_range_into_points() {
        let temp = tempdir().expect("tempdir");
        let db = loaded_db(temp.path()).await;

        let outcome = run(&cli(
            &db,
            &[
                "aggregate",
                "--portfolio",
                "p1",
                "--start",
                "01/01/2018 00:00:00",
                "--end",
                "01/01/2018 03:00:00",
                "--points",
                "2",
                "--slot-seconds",
                "3600",
                "--concurrency",
                "2",
            ],
        ))
        .await
        .expect("aggregate runs");

        assert_eq!(outcome.exit_code, 0);
        let data = outcome.envelope.data.expect("success carries data");
        assert_eq!(data["total_slots"], 4);
        let points = data["points"].as_array().expect("points array");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0]["start"], "2018-01-01T01:00:00Z");
        assert_eq!(points[0]["price"], "2");
        assert_eq!(points[1]["start"], "2018-01-01T03:00:00Z");
        assert_eq!(points[1]["price"], "4");
    }
}
