//! [`PriceSource`] over the DuckDB warehouse.
//!
//! DuckDB calls block, so each lookup runs on tokio's blocking pool against a
//! clone of the warehouse handle.

use pricemark_warehouse::{PriceQuery, Warehouse, WarehouseError};
use tracing::debug;

use crate::{CoreError, PriceFilter, PriceFuture, PriceSource, SourceError, TimeWindow};

impl PriceSource for Warehouse {
    fn query_prices<'a>(&'a self, window: TimeWindow, filter: &'a PriceFilter) -> PriceFuture<'a> {
        let warehouse = self.clone();
        let query = price_query(window, filter);

        Box::pin(async move {
            debug!(start = %window.start(), end = %window.end(), "warehouse lookup scheduled");
            tokio::task::spawn_blocking(move || warehouse.find_prices(&query))
                .await
                .map_err(|error| SourceError::internal(format!("price lookup task failed: {error}")))?
                .map_err(SourceError::from)
        })
    }
}

/// Translates a window and filter into the warehouse's query shape.
pub fn price_query(window: TimeWindow, filter: &PriceFilter) -> PriceQuery {
    PriceQuery {
        start: window.start().format_sql(),
        end: window.end().format_sql(),
        portfolio: filter.portfolio.clone(),
        owner: filter.owner.clone(),
        instrument: filter.instrument.clone(),
    }
}

impl From<WarehouseError> for SourceError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::InvalidStoredValue { .. } => Self::internal(error.to_string()),
            WarehouseError::UnrepresentablePrice { .. } => Self::invalid_request(error.to_string()),
            WarehouseError::DuckDb(_) | WarehouseError::Io(_) => Self::unavailable(error.to_string()),
        }
    }
}

impl From<WarehouseError> for CoreError {
    fn from(error: WarehouseError) -> Self {
        Self::Source(error.into())
    }
}
