use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{UtcDateTime, ValidationError};

/// A single priced fact. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub portfolio: String,
    pub owner: String,
    pub instrument: String,
    pub timestamp: UtcDateTime,
    pub price: Decimal,
}

impl PriceObservation {
    pub fn new(
        portfolio: impl Into<String>,
        owner: impl Into<String>,
        instrument: impl Into<String>,
        timestamp: UtcDateTime,
        price: Decimal,
    ) -> Self {
        Self {
            portfolio: portfolio.into(),
            owner: owner.into(),
            instrument: instrument.into(),
            timestamp,
            price,
        }
    }
}

/// Filter dimensions for a price lookup.
///
/// Present fields are AND-ed together; an absent field matches everything.
/// Blank strings are normalized to absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
}

impl PriceFilter {
    pub fn new(
        portfolio: Option<String>,
        owner: Option<String>,
        instrument: Option<String>,
    ) -> Self {
        Self {
            portfolio: non_blank(portfolio),
            owner: non_blank(owner),
            instrument: non_blank(instrument),
        }
    }

    pub fn portfolio(portfolio: impl Into<String>) -> Self {
        Self::new(Some(portfolio.into()), None, None)
    }

    pub fn is_empty(&self) -> bool {
        self.portfolio.is_none() && self.owner.is_none() && self.instrument.is_none()
    }

    pub fn matches(&self, observation: &PriceObservation) -> bool {
        field_matches(self.portfolio.as_deref(), &observation.portfolio)
            && field_matches(self.owner.as_deref(), &observation.owner)
            && field_matches(self.instrument.as_deref(), &observation.instrument)
    }
}

fn field_matches(expected: Option<&str>, actual: &str) -> bool {
    expected.is_none_or(|expected| expected == actual)
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: UtcDateTime,
    end: UtcDateTime,
}

impl TimeWindow {
    pub fn new(start: UtcDateTime, end: UtcDateTime) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub const fn start(self) -> UtcDateTime {
        self.start
    }

    pub const fn end(self) -> UtcDateTime {
        self.end
    }

    pub fn contains(self, instant: UtcDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// One computed statistic. `start` is the start instant of the interval it summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResult {
    pub start: UtcDateTime,
    pub price: Decimal,
}

impl StatResult {
    pub const fn new(start: UtcDateTime, price: Decimal) -> Self {
        Self { start, price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> UtcDateTime {
        UtcDateTime::parse(value).expect("valid timestamp")
    }

    #[test]
    fn blank_filter_fields_act_as_wildcards() {
        let filter = PriceFilter::new(Some(String::from("  ")), None, Some(String::from("bond")));
        assert_eq!(filter.portfolio, None);
        assert!(!filter.is_empty());

        let observation =
            PriceObservation::new("p1", "o1", "bond", ts("01/01/2018 00:00:00"), Decimal::ONE);
        assert!(filter.matches(&observation));
        assert!(!PriceFilter::portfolio("p2").matches(&observation));
    }

    #[test]
    fn window_is_half_open() {
        let window = TimeWindow::new(ts("01/01/2018 00:00:00"), ts("01/01/2018 01:00:00"))
            .expect("ordered window");

        assert!(window.contains(ts("01/01/2018 00:00:00")));
        assert!(window.contains(ts("01/01/2018 00:59:59")));
        assert!(!window.contains(ts("01/01/2018 01:00:00")));
    }

    #[test]
    fn rejects_inverted_window() {
        let err = TimeWindow::new(ts("01/02/2018 00:00:00"), ts("01/01/2018 00:00:00"))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedWindow { .. }));
    }
}
