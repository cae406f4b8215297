//! CSV loading of price observations into the warehouse.
//!
//! Expected header: `portfolio,owner,instrument,date,price`. Dates use any
//! format [`UtcDateTime::parse`] accepts; prices are plain decimals the
//! warehouse can store exactly (at most ten fractional digits).

use std::io::Read;
use std::str::FromStr;

use pricemark_warehouse::{check_price, PriceRecord, Warehouse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{CoreError, PriceObservation, UtcDateTime, ValidationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Import even when the warehouse already holds observations.
    pub append: bool,
}

/// Outcome of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_ingested: usize,
    /// The warehouse already held data and `append` was not set.
    pub skipped: bool,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    portfolio: String,
    owner: String,
    instrument: String,
    date: String,
    price: String,
}

/// Parses every row, failing on the first malformed one.
pub fn parse_csv<R: Read>(input: R) -> Result<Vec<PriceObservation>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let headers = reader
        .headers()
        .map_err(|error| invalid_record(error_line(&error), error.to_string()))?
        .clone();

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| invalid_record(error_line(&error), error.to_string()))?;
        let line = record.position().map_or(0, |position| position.line());
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|error| invalid_record(line, error.to_string()))?;
        observations.push(row.into_observation(line)?);
    }

    Ok(observations)
}

/// Reads `input` and stores its observations, logging the import under `source`.
///
/// When the warehouse already holds data and `options.append` is false the
/// input is not read at all and the report says `skipped`.
pub fn import_csv<R: Read>(
    warehouse: &Warehouse,
    source: &str,
    input: R,
    options: ImportOptions,
) -> Result<ImportReport, CoreError> {
    let existing = warehouse.observation_count()?;
    if existing > 0 && !options.append {
        warn!(source, existing, "warehouse already holds observations; import skipped");
        return Ok(ImportReport {
            rows_read: 0,
            rows_ingested: 0,
            skipped: true,
        });
    }

    let observations = parse_csv(input)?;
    let records: Vec<PriceRecord> = observations.iter().map(to_record).collect();
    let rows_ingested = warehouse.ingest_observations(source, &records)?;

    info!(source, rows = rows_ingested, "csv import finished");
    Ok(ImportReport {
        rows_read: observations.len(),
        rows_ingested,
        skipped: false,
    })
}

pub fn to_record(observation: &PriceObservation) -> PriceRecord {
    PriceRecord {
        portfolio: observation.portfolio.clone(),
        owner: observation.owner.clone(),
        instrument: observation.instrument.clone(),
        ts: observation.timestamp.format_sql(),
        price: observation.price,
    }
}

impl CsvRow {
    fn into_observation(self, line: u64) -> Result<PriceObservation, CoreError> {
        if self.portfolio.is_empty() {
            return Err(invalid_record(line, String::from("portfolio is empty")));
        }

        let timestamp = UtcDateTime::parse(&self.date)
            .map_err(|_| invalid_record(line, format!("unrecognised date '{}'", self.date)))?;
        let price = Decimal::from_str(&self.price)
            .or_else(|_| Decimal::from_scientific(&self.price))
            .map_err(|_| invalid_record(line, format!("price '{}' is not a decimal", self.price)))?;
        check_price(price).map_err(|error| invalid_record(line, error.to_string()))?;

        Ok(PriceObservation::new(
            self.portfolio,
            self.owner,
            self.instrument,
            timestamp,
            price,
        ))
    }
}

fn error_line(error: &csv::Error) -> u64 {
    error.position().map_or(0, |position| position.line())
}

fn invalid_record(line: u64, reason: String) -> CoreError {
    ValidationError::InvalidCsvRecord { line, reason }.into()
}
