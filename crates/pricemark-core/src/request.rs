//! Raw reporting parameters and their validated, slot-resolved forms.
//!
//! Checks run in a fixed order so the reported failure is deterministic:
//! timestamps are parsed first (format errors), then structural checks
//! (validation errors), then slot conversion (out-of-range errors).

use serde::{Deserialize, Serialize};

use crate::domain::non_blank;
use crate::{CoreError, PriceFilter, SlotClock, UtcDateTime, ValidationError};

/// Unparsed input of a single-slot average.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageParams {
    pub date: String,
    pub portfolio: Option<String>,
    pub owner: Option<String>,
    pub instrument: Option<String>,
}

/// Unparsed input of a single-slot benchmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkParams {
    pub date: String,
    pub portfolio: Option<String>,
}

/// Unparsed input of a multi-point aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateParams {
    pub portfolio: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub result_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AverageRequest {
    slot: i64,
    filter: PriceFilter,
}

impl AverageRequest {
    pub const fn slot(&self) -> i64 {
        self.slot
    }

    pub fn filter(&self) -> &PriceFilter {
        &self.filter
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRequest {
    slot: i64,
    filter: PriceFilter,
}

impl BenchmarkRequest {
    pub const fn slot(&self) -> i64 {
        self.slot
    }

    /// Portfolio-only filter.
    pub fn filter(&self) -> &PriceFilter {
        &self.filter
    }
}

/// Aggregate over `total_slots` slots starting at `first_slot`.
///
/// `total_slots >= result_points > 0` holds for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRequest {
    filter: PriceFilter,
    first_slot: i64,
    total_slots: i64,
    result_points: i64,
}

impl AggregateRequest {
    pub fn filter(&self) -> &PriceFilter {
        &self.filter
    }

    pub const fn first_slot(&self) -> i64 {
        self.first_slot
    }

    pub const fn total_slots(&self) -> i64 {
        self.total_slots
    }

    pub const fn result_points(&self) -> i64 {
        self.result_points
    }
}

/// Turns raw parameters into typed requests against a [`SlotClock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator {
    clock: SlotClock,
}

impl RequestValidator {
    pub const fn new(clock: SlotClock) -> Self {
        Self { clock }
    }

    pub const fn clock(&self) -> &SlotClock {
        &self.clock
    }

    pub fn average(&self, params: &AverageParams) -> Result<AverageRequest, CoreError> {
        let date = UtcDateTime::parse(&params.date)?;
        let filter = PriceFilter::new(
            params.portfolio.clone(),
            params.owner.clone(),
            params.instrument.clone(),
        );
        if filter.is_empty() {
            return Err(ValidationError::MissingFilter.into());
        }

        let slot = self.clock.to_slot(date)?;
        Ok(AverageRequest { slot, filter })
    }

    pub fn benchmark(&self, params: &BenchmarkParams) -> Result<BenchmarkRequest, CoreError> {
        let date = UtcDateTime::parse(&params.date)?;
        let filter = portfolio_filter(params.portfolio.as_ref())?;

        let slot = self.clock.to_slot(date)?;
        Ok(BenchmarkRequest { slot, filter })
    }

    pub fn aggregate(&self, params: &AggregateParams) -> Result<AggregateRequest, CoreError> {
        let start = UtcDateTime::parse(&params.start_date)?;
        let end = UtcDateTime::parse(&params.end_date)?;
        let filter = portfolio_filter(params.portfolio.as_ref())?;

        let result_points = params.result_points;
        if result_points <= 0 {
            return Err(ValidationError::NonPositiveResultPoints {
                actual: result_points,
            }
            .into());
        }
        if end < start {
            return Err(ValidationError::EndBeforeStart { start, end }.into());
        }

        let first_slot = self.clock.to_slot(start)?;
        let last_slot = self.clock.to_slot(end)?;
        let total_slots = last_slot - first_slot + 1;
        if total_slots < result_points {
            return Err(ValidationError::TooFewSlots {
                slots: total_slots,
                result_points,
            }
            .into());
        }

        Ok(AggregateRequest {
            filter,
            first_slot,
            total_slots,
            result_points,
        })
    }
}

fn portfolio_filter(portfolio: Option<&String>) -> Result<PriceFilter, ValidationError> {
    non_blank(portfolio.cloned())
        .map(PriceFilter::portfolio)
        .ok_or(ValidationError::MissingPortfolio)
}
