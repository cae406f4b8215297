use thiserror::Error;

use crate::{SourceError, UtcDateTime};

/// Structural precondition failures raised before any computation runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("provide at least one filter: portfolio, owner or instrument")]
    MissingFilter,
    #[error("portfolio name is required")]
    MissingPortfolio,
    #[error("result points must be positive, got {actual}")]
    NonPositiveResultPoints { actual: i64 },
    #[error("start date {start} must not be after end date {end}")]
    EndBeforeStart {
        start: UtcDateTime,
        end: UtcDateTime,
    },
    #[error("{slots} time slot(s) between start and end date, fewer than {result_points} result points")]
    TooFewSlots { slots: i64, result_points: i64 },
    #[error("slot duration must be positive")]
    NonPositiveSlotDuration,
    #[error("window start {start} is after window end {end}")]
    InvertedWindow {
        start: UtcDateTime,
        end: UtcDateTime,
    },
    #[error("csv line {line}: {reason}")]
    InvalidCsvRecord { line: u64, reason: String },
}

/// Timestamp or slot index outside what the slot clock can represent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutOfRangeError {
    #[error("timestamp {value} is before the slot epoch {epoch}")]
    BeforeEpoch {
        value: UtcDateTime,
        epoch: UtcDateTime,
    },
    #[error("timestamp {value} maps to a slot index above {max}")]
    SlotIndexTooLarge { value: UtcDateTime, max: i64 },
    #[error("slot index cannot be negative: {index}")]
    NegativeSlot { index: i64 },
    #[error("slot index {index} starts beyond the representable time range")]
    SlotStartOverflow { index: i64 },
}

/// Classification of a [`CoreError`], used by transport layers for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Validation,
    OutOfRange,
    NoData,
    EmptyInput,
    Overflow,
    Source,
}

impl ErrorKind {
    /// Caller-input problems, as opposed to "nothing to report" or lookup failures.
    pub const fn is_caller_input(self) -> bool {
        matches!(self, Self::Format | Self::Validation | Self::OutOfRange)
    }
}

/// Single discriminated failure of every reporting operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("timestamp '{value}' is in an incorrect format, expected {expected}")]
    Format {
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),

    #[error("no price observations for the period starting {start}")]
    NoData { start: UtcDateTime },

    #[error("statistic requested over an empty set of prices")]
    EmptyInput,

    #[error("{operation} of prices exceeds the decimal range")]
    Overflow { operation: &'static str },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl CoreError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Format { .. } => ErrorKind::Format,
            Self::Validation(_) => ErrorKind::Validation,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::NoData { .. } => ErrorKind::NoData,
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::Source(_) => ErrorKind::Source,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Format { .. } => "request.format",
            Self::Validation(_) => "request.validation",
            Self::OutOfRange(_) => "request.out_of_range",
            Self::NoData { .. } => "report.no_data",
            Self::EmptyInput => "report.empty_input",
            Self::Overflow { .. } => "report.overflow",
            Self::Source(error) => error.code(),
        }
    }

    /// The date a failure refers to, when there is one.
    pub fn date(&self) -> Option<UtcDateTime> {
        match self {
            Self::NoData { start } => Some(*start),
            Self::OutOfRange(OutOfRangeError::BeforeEpoch { value, .. })
            | Self::OutOfRange(OutOfRangeError::SlotIndexTooLarge { value, .. }) => Some(*value),
            _ => None,
        }
    }
}
