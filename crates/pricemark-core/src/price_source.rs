//! Price lookup contract consumed by the reporting service.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`InMemoryPriceSource`] | `Vec<PriceObservation>` filtered in memory |
//! | `pricemark_warehouse::Warehouse` | DuckDB query on a blocking thread |
//!
//! Results are an unordered multiset of prices; callers must not rely on order.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{PriceFilter, PriceObservation, TimeWindow};

/// Boxed future returned by [`PriceSource::query_prices`].
pub type PriceFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Decimal>, SourceError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    InvalidRequest,
    Internal,
}

/// Structured lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Returns every price observed inside a half-open window that matches a filter.
///
/// Present filter fields are AND-ed; absent fields match everything.
pub trait PriceSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] when the backing store cannot answer.
    fn query_prices<'a>(&'a self, window: TimeWindow, filter: &'a PriceFilter) -> PriceFuture<'a>;
}

impl<T> PriceSource for Arc<T>
where
    T: PriceSource + ?Sized,
{
    fn query_prices<'a>(&'a self, window: TimeWindow, filter: &'a PriceFilter) -> PriceFuture<'a> {
        (**self).query_prices(window, filter)
    }
}

/// Source over a fixed set of observations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    observations: Vec<PriceObservation>,
}

impl InMemoryPriceSource {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        Self { observations }
    }

    pub fn push(&mut self, observation: PriceObservation) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl FromIterator<PriceObservation> for InMemoryPriceSource {
    fn from_iter<I: IntoIterator<Item = PriceObservation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl PriceSource for InMemoryPriceSource {
    fn query_prices<'a>(&'a self, window: TimeWindow, filter: &'a PriceFilter) -> PriceFuture<'a> {
        Box::pin(async move {
            Ok(self
                .observations
                .iter()
                .filter(|observation| window.contains(observation.timestamp))
                .filter(|observation| filter.matches(observation))
                .map(|observation| observation.price)
                .collect())
        })
    }
}
