//! Reporting service: single-slot average and benchmark, multi-point aggregate.
//!
//! Every call re-queries the [`PriceSource`]; nothing is cached between calls.
//! Aggregate spans go through an order-preserving buffered stream, so results
//! and the reported failure both follow span order regardless of how many
//! lookups run at once. When a span fails, lookups still in flight are dropped.

use futures::stream::{self, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::planner::{plan_spans, SlotSpan};
use crate::statistics::{average, benchmark};
use crate::{
    AggregateRequest, AverageRequest, BenchmarkRequest, CoreError, PriceFilter, PriceSource,
    SlotClock, StatResult, TimeWindow, UtcDateTime,
};

/// Tuning for [`PriceReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Aggregate spans looked up at once. `1` evaluates them left to right.
    pub max_concurrency: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

pub struct PriceReporter<S> {
    clock: SlotClock,
    source: S,
    config: ReporterConfig,
}

impl<S> PriceReporter<S>
where
    S: PriceSource,
{
    pub fn new(clock: SlotClock, source: S) -> Self {
        Self::with_config(clock, source, ReporterConfig::default())
    }

    pub fn with_config(clock: SlotClock, source: S, config: ReporterConfig) -> Self {
        Self {
            clock,
            source,
            config,
        }
    }

    pub const fn clock(&self) -> &SlotClock {
        &self.clock
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Plain mean of every matching price in the request's slot.
    pub async fn average(&self, request: &AverageRequest) -> Result<StatResult, CoreError> {
        let window = self.clock.slots_window(request.slot(), request.slot() + 1)?;
        let prices = self.fetch(window, request.filter()).await?;
        let price = reduce(&prices, window.start(), average)?;

        info!(slot = request.slot(), %price, "average computed");
        Ok(StatResult::new(window.start(), price))
    }

    /// Outlier-trimmed mean of the portfolio's prices in the request's slot.
    pub async fn benchmark(&self, request: &BenchmarkRequest) -> Result<StatResult, CoreError> {
        let window = self.clock.slots_window(request.slot(), request.slot() + 1)?;
        let prices = self.fetch(window, request.filter()).await?;
        let price = reduce(&prices, window.start(), benchmark)?;

        info!(slot = request.slot(), %price, "benchmark computed");
        Ok(StatResult::new(window.start(), price))
    }

    /// One benchmark per span, in span order.
    ///
    /// Fails as a whole on the first span (in span order) without observations.
    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<Vec<StatResult>, CoreError> {
        let spans = plan_spans(
            request.first_slot(),
            request.total_slots(),
            request.result_points(),
        );
        let concurrency = self.config.max_concurrency.max(1);

        let results: Vec<StatResult> = stream::iter(spans)
            .map(|span| self.span_benchmark(span, request.filter()))
            .buffered(concurrency)
            .try_collect()
            .await?;

        info!(
            first_slot = request.first_slot(),
            total_slots = request.total_slots(),
            points = results.len(),
            "aggregate computed"
        );
        Ok(results)
    }

    async fn span_benchmark(
        &self,
        span: SlotSpan,
        filter: &PriceFilter,
    ) -> Result<StatResult, CoreError> {
        let label = span.label(&self.clock)?;
        let window = span.window(&self.clock)?;
        let prices = self.fetch(window, filter).await?;
        debug!(
            first = span.first,
            end = span.end,
            observations = prices.len(),
            "span fetched"
        );

        let price = reduce(&prices, label, benchmark)?;
        Ok(StatResult::new(label, price))
    }

    async fn fetch(
        &self,
        window: TimeWindow,
        filter: &PriceFilter,
    ) -> Result<Vec<Decimal>, CoreError> {
        let prices = self.source.query_prices(window, filter).await?;
        debug!(
            start = %window.start(),
            end = %window.end(),
            observations = prices.len(),
            "prices looked up"
        );
        Ok(prices)
    }
}

fn reduce(
    prices: &[Decimal],
    label: UtcDateTime,
    statistic: fn(&[Decimal]) -> Result<Decimal, CoreError>,
) -> Result<Decimal, CoreError> {
    if prices.is_empty() {
        return Err(CoreError::NoData { start: label });
    }
    statistic(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AggregateParams, InMemoryPriceSource, PriceFuture, PriceObservation, RequestValidator,
        SourceError,
    };

    fn ts(value: &str) -> UtcDateTime {
        UtcDateTime::parse(value).expect("valid timestamp")
    }

    fn request(start: &str, end: &str, result_points: i64) -> AggregateRequest {
        RequestValidator::default()
            .aggregate(&AggregateParams {
                portfolio: Some(String::from("p1")),
                start_date: start.to_owned(),
                end_date: end.to_owned(),
                result_points,
            })
            .expect("valid request")
    }

    fn observation(at: &str, price: i64) -> PriceObservation {
        PriceObservation::new("p1", "o1", "bond", ts(at), Decimal::from(price))
    }

    struct FailingSource;

    impl PriceSource for FailingSource {
        fn query_prices<'a>(
            &'a self,
            _window: TimeWindow,
            _filter: &'a PriceFilter,
        ) -> PriceFuture<'a> {
            Box::pin(async { Err(SourceError::unavailable("offline")) })
        }
    }

    #[tokio::test]
    async fn aggregate_labels_each_span_by_its_last_slot() {
        // Slots 0..=3 each hold one price equal to the slot index + 1. With two
        // prices per span both quartiles land on the larger one, so the fences
        // collapse onto it.
        let source: InMemoryPriceSource = [
            observation("01/01/2018 00:00:00", 1),
            observation("01/01/2018 02:46:40", 2),
            observation("01/01/2018 05:33:20", 3),
            observation("01/01/2018 08:20:00", 4),
        ]
        .into_iter()
        .collect();
        let reporter = PriceReporter::new(SlotClock::default(), source);

        let results = reporter
            .aggregate(&request("01/01/2018 00:00:00", "01/01/2018 08:20:00", 2))
            .await
            .expect("aggregate should succeed");

        assert_eq!(
            results,
            vec![
                StatResult::new(ts("01/01/2018 02:46:40"), Decimal::from(2)),
                StatResult::new(ts("01/01/2018 08:20:00"), Decimal::from(4)),
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_aggregate_reports_first_empty_span_in_order() {
        // Spans 1 and 2 are both empty; span 1 must be reported.
        let source: InMemoryPriceSource = [observation("01/01/2018 00:00:00", 1)]
            .into_iter()
            .collect();
        let reporter = PriceReporter::with_config(
            SlotClock::default(),
            source,
            ReporterConfig { max_concurrency: 4 },
        );

        let err = reporter
            .aggregate(&request("01/01/2018 00:00:00", "01/01/2018 05:33:20", 3))
            .await
            .expect_err("must fail");

        assert_eq!(
            err,
            CoreError::NoData {
                start: ts("01/01/2018 02:46:40")
            }
        );
    }

    #[tokio::test]
    async fn source_failures_propagate() {
        let reporter = PriceReporter::new(SlotClock::default(), FailingSource);

        let err = reporter
            .aggregate(&request("01/01/2018 00:00:00", "01/01/2018 00:00:00", 1))
            .await
            .expect_err("must fail");

        assert!(matches!(err, CoreError::Source(ref source) if source.code() == "source.unavailable"));
    }

    #[tokio::test]
    async fn zero_concurrency_still_runs() {
        let source: InMemoryPriceSource = [observation("01/01/2018 00:00:00", 7)]
            .into_iter()
            .collect();
        let reporter = PriceReporter::with_config(
            SlotClock::default(),
            source,
            ReporterConfig { max_concurrency: 0 },
        );

        let results = reporter
            .aggregate(&request("01/01/2018 00:00:00", "01/01/2018 00:00:00", 1))
            .await
            .expect("aggregate should succeed");
        assert_eq!(results, vec![StatResult::new(ts("01/01/2018 00:00:00"), Decimal::from(7))]);
    }
}
