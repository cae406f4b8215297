//! Price reductions: quartiles, the IQR-trimmed benchmark and the plain mean.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::CoreError;

/// Multiplier applied to the interquartile range when trimming outliers.
const IQR_FENCE: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// First, second and third quartile, taken directly from the sorted prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quartiles {
    pub q1: Decimal,
    pub q2: Decimal,
    pub q3: Decimal,
}

/// Quartiles by nearest-rank index, without interpolation.
///
/// For `n` prices sorted ascending the indices are `ceil((n-1)/4)`,
/// `ceil((n-1)/2)` and `ceil(3(n-1)/4)`.
pub fn quartiles(prices: &[Decimal]) -> Result<Quartiles, CoreError> {
    if prices.is_empty() {
        return Err(CoreError::EmptyInput);
    }

    let mut sorted = prices.to_vec();
    sorted.sort_unstable();
    Ok(quartiles_of_sorted(&sorted))
}

fn quartiles_of_sorted(sorted: &[Decimal]) -> Quartiles {
    let last = sorted.len() - 1;
    Quartiles {
        q1: sorted[last.div_ceil(4)],
        q2: sorted[last.div_ceil(2)],
        q3: sorted[(3 * last).div_ceil(4)],
    }
}

/// Mean of the prices inside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`, bounds inclusive.
///
/// A fence beyond the decimal range saturates, which keeps every price on
/// that side.
pub fn benchmark(prices: &[Decimal]) -> Result<Decimal, CoreError> {
    let Quartiles { q1, q3, .. } = quartiles(prices)?;
    let fence = q3.saturating_sub(q1).saturating_mul(IQR_FENCE);
    let lower = q1.saturating_sub(fence);
    let upper = q3.saturating_add(fence);

    let kept: Vec<Decimal> = prices
        .iter()
        .copied()
        .filter(|price| lower <= *price && *price <= upper)
        .collect();

    // Q1 and Q3 are members of `prices` and always inside the fences.
    debug_assert!(!kept.is_empty());
    average(&kept)
}

/// Arithmetic mean, without trailing zeros.
///
/// Fails with [`CoreError::Overflow`] when the running sum leaves the decimal range.
pub fn average(prices: &[Decimal]) -> Result<Decimal, CoreError> {
    if prices.is_empty() {
        return Err(CoreError::EmptyInput);
    }

    let total = prices
        .iter()
        .try_fold(Decimal::ZERO, |total, price| total.checked_add(*price))
        .ok_or(CoreError::Overflow { operation: "sum" })?;
    let mean = total
        .checked_div(Decimal::from(prices.len()))
        .ok_or(CoreError::Overflow { operation: "mean" })?;
    Ok(mean.normalize())
}
