//! Fixed-width time slots anchored at an epoch.
//!
//! Slot `n` covers `[epoch + n * duration, epoch + (n + 1) * duration)`.
//! Conversions use whole-nanosecond integer arithmetic, so there is no
//! floating-point drift at slot boundaries.

use time::macros::datetime;
use time::Duration;

use crate::{OutOfRangeError, TimeWindow, UtcDateTime, ValidationError};

/// Largest slot index the clock hands out.
pub const MAX_SLOT_INDEX: i64 = i32::MAX as i64;

/// Epoch and slot width of a [`SlotClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClockConfig {
    pub epoch: UtcDateTime,
    pub slot_duration: Duration,
}

impl Default for SlotClockConfig {
    /// 2018-01-01T00:00:00Z with 10,000 second slots.
    fn default() -> Self {
        Self {
            epoch: UtcDateTime::from_offset_datetime(datetime!(2018-01-01 0:00 UTC)),
            slot_duration: Duration::seconds(10_000),
        }
    }
}

/// Converts between instants and slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClock {
    epoch: UtcDateTime,
    slot_duration: Duration,
}

impl Default for SlotClock {
    fn default() -> Self {
        let config = SlotClockConfig::default();
        Self {
            epoch: config.epoch,
            slot_duration: config.slot_duration,
        }
    }
}

impl SlotClock {
    pub fn new(config: SlotClockConfig) -> Result<Self, ValidationError> {
        if !config.slot_duration.is_positive() {
            return Err(ValidationError::NonPositiveSlotDuration);
        }

        Ok(Self {
            epoch: config.epoch,
            slot_duration: config.slot_duration,
        })
    }

    pub const fn epoch(&self) -> UtcDateTime {
        self.epoch
    }

    pub const fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    /// Index of the slot containing `timestamp`.
    pub fn to_slot(&self, timestamp: UtcDateTime) -> Result<i64, OutOfRangeError> {
        if timestamp < self.epoch {
            return Err(OutOfRangeError::BeforeEpoch {
                value: timestamp,
                epoch: self.epoch,
            });
        }

        let elapsed = timestamp.duration_since(self.epoch).whole_nanoseconds();
        let index = elapsed / self.slot_duration.whole_nanoseconds();

        if index > i128::from(MAX_SLOT_INDEX) {
            return Err(OutOfRangeError::SlotIndexTooLarge {
                value: timestamp,
                max: MAX_SLOT_INDEX,
            });
        }

        // Bounded by MAX_SLOT_INDEX above.
        Ok(index as i64)
    }

    /// Start instant of slot `index`.
    pub fn slot_start(&self, index: i64) -> Result<UtcDateTime, OutOfRangeError> {
        if index < 0 {
            return Err(OutOfRangeError::NegativeSlot { index });
        }

        i32::try_from(index)
            .ok()
            .and_then(|factor| self.slot_duration.checked_mul(factor))
            .and_then(|offset| self.epoch.checked_add(offset))
            .ok_or(OutOfRangeError::SlotStartOverflow { index })
    }

    /// Half-open window covering slots `first..end`.
    pub fn slots_window(&self, first: i64, end: i64) -> Result<TimeWindow, crate::CoreError> {
        let start = self.slot_start(first)?;
        let end = self.slot_start(end)?;
        Ok(TimeWindow::new(start, end)?)
    }
}
