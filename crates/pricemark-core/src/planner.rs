//! Partitioning of a slot range into result spans.

use serde::Serialize;

use crate::{OutOfRangeError, SlotClock, TimeWindow, UtcDateTime};

/// Contiguous run of slots `[first, end)` feeding one aggregate point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotSpan {
    pub first: i64,
    pub end: i64,
}

impl SlotSpan {
    pub const fn len(self) -> i64 {
        self.end - self.first
    }

    pub const fn is_empty(self) -> bool {
        self.end <= self.first
    }

    /// Start of the span's last slot. Aggregate points are labelled with it.
    pub fn label(self, clock: &SlotClock) -> Result<UtcDateTime, OutOfRangeError> {
        clock.slot_start(self.end - 1)
    }

    /// Time covered by every slot of the span.
    pub fn window(self, clock: &SlotClock) -> Result<TimeWindow, crate::CoreError> {
        clock.slots_window(self.first, self.end)
    }
}

/// Splits `total_slots` slots starting at `first_slot` into `result_points` spans.
///
/// Every span gets `total_slots / result_points` slots. The remainder goes to
/// the earliest spans, one extra slot each. Returns no spans when
/// `result_points` is not positive.
pub fn plan_spans(first_slot: i64, total_slots: i64, result_points: i64) -> Vec<SlotSpan> {
    if result_points <= 0 {
        return Vec::new();
    }

    let frame = total_slots / result_points;
    let mut rest = total_slots % result_points;
    let mut left = first_slot;
    let mut spans = Vec::with_capacity(usize::try_from(result_points).unwrap_or_default());

    for _ in 0..result_points {
        let mut right = left + frame;
        if rest > 0 {
            right += 1;
            rest -= 1;
        }
        spans.push(SlotSpan {
            first: left,
            end: right,
        });
        left = right;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sizes(spans: &[SlotSpan]) -> Vec<i64> {
        spans.iter().map(|span| span.len()).collect()
    }

    #[test]
    fn remainder_goes_to_earliest_spans() {
        assert_eq!(sizes(&plan_spans(0, 9, 2)), vec![5, 4]);
        assert_eq!(sizes(&plan_spans(0, 9, 3)), vec![3, 3, 3]);
        assert_eq!(sizes(&plan_spans(0, 11, 4)), vec![3, 3, 3, 2]);
    }

    #[test]
    fn spans_are_contiguous_from_first_slot() {
        let spans = plan_spans(7, 9, 2);
        assert_eq!(
            spans,
            vec![
                SlotSpan { first: 7, end: 12 },
                SlotSpan { first: 12, end: 16 },
            ]
        );
    }

    #[test]
    fn span_is_labelled_by_its_last_slot() {
        let clock = SlotClock::default();
        let span = SlotSpan { first: 0, end: 5 };

        let label = span.label(&clock).expect("representable");
        assert_eq!(label, clock.slot_start(4).expect("representable"));

        let window = span.window(&clock).expect("representable");
        assert_eq!(window.start(), clock.slot_start(0).expect("representable"));
        assert_eq!(window.end(), clock.slot_start(5).expect("representable"));
    }

    #[test]
    fn one_slot_per_point_when_counts_match() {
        let spans = plan_spans(3, 4, 4);
        assert!(spans.iter().all(|span| span.len() == 1));
        assert_eq!(spans.last().map(|span| span.end), Some(7));
    }

    #[test]
    fn non_positive_points_plan_nothing() {
        assert!(plan_spans(0, 9, 0).is_empty());
        assert!(plan_spans(0, 9, -1).is_empty());
    }

    proptest! {
        #[test]
        fn partition_covers_range_front_loaded(
            first in 0i64..1_000,
            points in 1i64..64,
            extra in 0i64..500,
        ) {
            let total = points + extra;
            let spans = plan_spans(first, total, points);

            prop_assert_eq!(spans.len() as i64, points);
            prop_assert_eq!(spans[0].first, first);
            prop_assert_eq!(spans[spans.len() - 1].end, first + total);
            prop_assert_eq!(spans.iter().map(|span| span.len()).sum::<i64>(), total);

            for pair in spans.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].first);
                prop_assert!(pair[0].len() >= pair[1].len());
                prop_assert!(pair[0].len() - pair[1].len() <= 1);
            }
            prop_assert!(spans.iter().all(|span| !span.is_empty()));
        }
    }
}
