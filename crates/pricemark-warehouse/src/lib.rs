//! # Pricemark Warehouse
//!
//! DuckDB store for timestamped price observations.
//!
//! All caller values reach SQL as bound parameters. Timestamps travel as
//! `YYYY-MM-DD HH:MM:SS[.ffffff]` literals and prices as decimal strings.
//! Prices are stored as `DECIMAL(38, 10)`; [`check_price`] rejects values
//! that column would round or overflow, so stored prices read back exactly.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `price_observations` | One row per observed price |
//! | `import_log` | One row per completed import |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::duckdb::{params, ToSql};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

pub use duckdb::{DuckDbConnectionManager, PooledConnection, IN_MEMORY};

/// Fractional digits of the `price` column.
pub const PRICE_SCALE: u32 = 10;

/// 10^28: integer part limit of `DECIMAL(38, 10)`.
const PRICE_LIMIT: Decimal = Decimal::from_parts(0x1000_0000, 0x3E25_0261, 0x204F_CE5E, false, 0);

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A price the `price` column cannot hold exactly.
    #[error("price {value} needs at most {PRICE_SCALE} fractional digits and an absolute value below 1e28")]
    UnrepresentablePrice { value: String },

    /// A stored value could not be read back into its Rust type.
    #[error("stored value '{value}' is unreadable: {reason}")]
    InvalidStoredValue { value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for pricemark data.
    pub pricemark_home: PathBuf,
    /// Database file, or [`IN_MEMORY`].
    pub db_path: PathBuf,
    /// Idle connections kept for reuse.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let pricemark_home = resolve_pricemark_home();
        let db_path = pricemark_home.join("warehouse.duckdb");
        Self {
            pricemark_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Private in-memory database, discarded with the last [`Warehouse`] clone.
    pub fn in_memory() -> Self {
        Self {
            pricemark_home: PathBuf::from("."),
            db_path: PathBuf::from(IN_MEMORY),
            max_pool_size: 4,
        }
    }

    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// One observation to store. `ts` is a UTC SQL timestamp literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub portfolio: String,
    pub owner: String,
    pub instrument: String,
    pub ts: String,
    pub price: Decimal,
}

/// Half-open window `[start, end)` plus optional equality filters.
///
/// `start` and `end` are UTC SQL timestamp literals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceQuery {
    pub start: String,
    pub end: String,
    pub portfolio: Option<String>,
    pub owner: Option<String>,
    pub instrument: Option<String>,
}

/// An `import_log` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub source: String,
    pub row_count: i64,
    pub imported_at: String,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::in_memory())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if config.db_path.as_os_str() != IN_MEMORY {
            if let Some(parent) = config.db_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Stores `rows` and logs the import under `source`, all in one transaction.
    ///
    /// Returns the number of rows stored.
    pub fn ingest_observations(
        &self,
        source: &str,
        rows: &[PriceRecord],
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in rows {
            check_price(row.price)?;
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut statement = connection.prepare(
                "INSERT INTO price_observations (portfolio, owner, instrument, ts, price) \
                 VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS DECIMAL(38, 10)))",
            )?;
            for row in rows {
                let price = row.price.to_string();
                let params: [&dyn ToSql; 5] =
                    [&row.portfolio, &row.owner, &row.instrument, &row.ts, &price];
                statement.execute(params.as_slice())?;
            }

            let row_count = i64::try_from(rows.len()).unwrap_or(i64::MAX);
            connection.execute(
                "INSERT INTO import_log (source, row_count, imported_at) \
                 VALUES (?, ?, CURRENT_TIMESTAMP)",
                params![source, row_count],
            )?;

            Ok(rows.len())
        })();

        let stored = finalize_transaction(&connection, result)?;
        info!(source, rows = stored, "observations ingested");
        Ok(stored)
    }

    /// Prices of every observation matching `query`, in no particular order.
    pub fn find_prices(&self, query: &PriceQuery) -> Result<Vec<Decimal>, WarehouseError> {
        let mut sql = String::from(
            "SELECT CAST(price AS VARCHAR) FROM price_observations \
             WHERE ts >= CAST(? AS TIMESTAMP) AND ts < CAST(? AS TIMESTAMP)",
        );
        let mut params: Vec<&dyn ToSql> = vec![&query.start, &query.end];
        for (column, value) in [
            ("portfolio", query.portfolio.as_ref()),
            ("owner", query.owner.as_ref()),
            ("instrument", query.instrument.as_ref()),
        ] {
            if let Some(value) = value {
                sql.push_str(" AND ");
                sql.push_str(column);
                sql.push_str(" = ?");
                params.push(value);
            }
        }

        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(sql.as_str())?;
        let texts = statement
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let prices = texts
            .into_iter()
            .map(|text| parse_price(&text))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            start = query.start.as_str(),
            end = query.end.as_str(),
            rows = prices.len(),
            "price query executed"
        );
        Ok(prices)
    }

    pub fn observation_count(&self) -> Result<u64, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM price_observations", [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Completed imports, oldest first.
    pub fn import_history(&self) -> Result<Vec<ImportRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT source, row_count, CAST(imported_at AS VARCHAR) FROM import_log \
             ORDER BY imported_at, source",
        )?;
        let records = statement
            .query_map([], |row| {
                Ok(ImportRecord {
                    source: row.get(0)?,
                    row_count: row.get(1)?,
                    imported_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Fails when `price` would be rounded or overflow on its way into storage.
///
/// Trailing zeros do not count towards the scale.
pub fn check_price(price: Decimal) -> Result<(), WarehouseError> {
    if price.normalize().scale() > PRICE_SCALE || price.abs() >= PRICE_LIMIT {
        return Err(WarehouseError::UnrepresentablePrice {
            value: price.to_string(),
        });
    }
    Ok(())
}

fn parse_price(text: &str) -> Result<Decimal, WarehouseError> {
    Decimal::from_str(text)
        .map(|price| price.normalize())
        .map_err(|error| WarehouseError::InvalidStoredValue {
            value: text.to_owned(),
            reason: error.to_string(),
        })
}

/// Commits on success, rolls back on failure.
fn finalize_transaction<T>(
    connection: &::duckdb::Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_pricemark_home() -> PathBuf {
    if let Some(path) = env::var_os("PRICEMARK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pricemark");
    }

    PathBuf::from(".pricemark")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(portfolio: &str, owner: &str, ts: &str, price: Decimal) -> PriceRecord {
        PriceRecord {
            portfolio: portfolio.to_owned(),
            owner: owner.to_owned(),
            instrument: String::from("bond"),
            ts: ts.to_owned(),
            price,
        }
    }

    fn window(start: &str, end: &str) -> PriceQuery {
        PriceQuery {
            start: start.to_owned(),
            end: end.to_owned(),
            ..PriceQuery::default()
        }
    }

    #[test]
    fn initializes_schema_on_disk() {
        let temp = tempdir().expect("tempdir");
        let pricemark_home = temp.path().join("pricemark-home");
        let db_path = pricemark_home.join("warehouse.duckdb");

        let warehouse = Warehouse::open(WarehouseConfig {
            pricemark_home,
            db_path: db_path.clone(),
            max_pool_size: 2,
        })
        .expect("warehouse open");

        assert!(db_path.exists());
        assert_eq!(warehouse.observation_count().expect("count"), 0);
    }

    #[test]
    fn query_window_is_half_open() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        warehouse
            .ingest_observations(
                "unit",
                &[
                    record("p1", "o1", "2018-01-01 00:00:00", Decimal::from(1)),
                    record("p1", "o1", "2018-01-01 00:59:59.999999", Decimal::from(2)),
                    record("p1", "o1", "2018-01-01 01:00:00", Decimal::from(3)),
                ],
            )
            .expect("ingest");

        let mut prices = warehouse
            .find_prices(&window("2018-01-01 00:00:00", "2018-01-01 01:00:00"))
            .expect("query");
        prices.sort();

        assert_eq!(prices, vec![Decimal::from(1), Decimal::from(2)]);
    }

    #[test]
    fn filters_are_anded_and_optional() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        warehouse
            .ingest_observations(
                "unit",
                &[
                    record("p1", "o1", "2018-01-01 00:10:00", Decimal::from(1)),
                    record("p1", "o2", "2018-01-01 00:20:00", Decimal::from(2)),
                    record("p2", "o1", "2018-01-01 00:30:00", Decimal::from(3)),
                ],
            )
            .expect("ingest");

        let mut query = window("2018-01-01 00:00:00", "2018-01-02 00:00:00");
        query.portfolio = Some(String::from("p1"));
        query.owner = Some(String::from("o1"));
        assert_eq!(
            warehouse.find_prices(&query).expect("query"),
            vec![Decimal::from(1)]
        );

        query.portfolio = None;
        let mut by_owner = warehouse.find_prices(&query).expect("query");
        by_owner.sort();
        assert_eq!(by_owner, vec![Decimal::from(1), Decimal::from(3)]);
    }

    #[test]
    fn prices_keep_decimal_precision() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        let price = Decimal::from_str("1234.0000000001").expect("decimal");
        warehouse
            .ingest_observations("unit", &[record("p1", "o1", "2018-01-01 00:00:00", price)])
            .expect("ingest");

        let prices = warehouse
            .find_prices(&window("2018-01-01 00:00:00", "2018-01-01 00:00:01"))
            .expect("query");
        assert_eq!(prices, vec![price]);
    }

    #[test]
    fn filter_values_are_bound_not_interpolated() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        let hostile = r#"p1'; DROP TABLE price_observations; --"#;
        warehouse
            .ingest_observations(
                "unit",
                &[record(hostile, "o1", "2018-01-01 00:00:00", Decimal::ONE)],
            )
            .expect("ingest should succeed with bound parameters");

        let mut query = window("2018-01-01 00:00:00", "2018-01-02 00:00:00");
        query.portfolio = Some(hostile.to_owned());
        assert_eq!(warehouse.find_prices(&query).expect("query").len(), 1);
        assert_eq!(warehouse.observation_count().expect("count"), 1);
    }

    #[test]
    fn failed_import_rolls_back() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        let error = warehouse
            .ingest_observations(
                "unit",
                &[
                    record("p1", "o1", "2018-01-01 00:00:00", Decimal::ONE),
                    record("p1", "o1", "not a timestamp", Decimal::ONE),
                ],
            )
            .expect_err("bad timestamp must fail");

        assert!(matches!(error, WarehouseError::DuckDb(_)));
        assert_eq!(warehouse.observation_count().expect("count"), 0);
        assert!(warehouse.import_history().expect("history").is_empty());
    }

    #[test]
    fn prices_the_column_would_round_are_rejected() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        let error = warehouse
            .ingest_observations(
                "unit",
                &[
                    record("p1", "o1", "2018-01-01 00:00:00", Decimal::ONE),
                    record("p1", "o1", "2018-01-01 00:00:01", Decimal::new(123_456_789_012, 12)),
                ],
            )
            .expect_err("twelve fractional digits must fail");

        assert!(matches!(error, WarehouseError::UnrepresentablePrice { ref value } if value == "0.123456789012"));
        assert_eq!(warehouse.observation_count().expect("count"), 0);
    }

    #[test]
    fn price_limits_ignore_trailing_zeros() {
        check_price(Decimal::new(15_000_000_000_000, 13)).expect("1.5 fits");
        check_price(Decimal::new(1_234_567_891, 10)).expect("ten fractional digits fit");
        assert!(check_price(PRICE_LIMIT).is_err());
        assert!(check_price(-PRICE_LIMIT).is_err());
        check_price(PRICE_LIMIT - Decimal::ONE).expect("28 integer digits fit");
    }

    #[test]
    fn imports_are_logged() {
        let warehouse = Warehouse::open_in_memory().expect("warehouse open");
        warehouse
            .ingest_observations(
                "prices.csv",
                &[
                    record("p1", "o1", "2018-01-01 00:00:00", Decimal::ONE),
                    record("p1", "o1", "2018-01-01 00:00:01", Decimal::TWO),
                ],
            )
            .expect("ingest");

        let history = warehouse.import_history().expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, "prices.csv");
        assert_eq!(history[0].row_count, 2);
    }
}
