//! Core contracts for pricemark.
//!
//! This crate contains:
//! - Domain models, UTC timestamps and structured errors
//! - The slot clock that discretizes time into fixed-width slots
//! - Quartile, benchmark and average statistics
//! - Request validation and the aggregate span planner
//! - The price lookup port and the reporting service built on it
//! - CSV ingestion and the response envelope

pub mod domain;
pub mod envelope;
pub mod error;
pub mod ingest;
pub mod planner;
pub mod price_source;
pub mod reporting;
pub mod request;
pub mod slots;
pub mod statistics;
pub mod warehouse_source;

pub use domain::{PriceFilter, PriceObservation, StatResult, TimeWindow, UtcDateTime, REQUEST_FORMAT};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, EnvelopeValidationError};
pub use error::{CoreError, ErrorKind, OutOfRangeError, ValidationError};
pub use ingest::{import_csv, parse_csv, ImportOptions, ImportReport};
pub use planner::{plan_spans, SlotSpan};
pub use price_source::{InMemoryPriceSource, PriceFuture, PriceSource, SourceError, SourceErrorKind};
pub use pricemark_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use reporting::{PriceReporter, ReporterConfig};
pub use request::{
    AggregateParams, AggregateRequest, AverageParams, AverageRequest, BenchmarkParams,
    BenchmarkRequest, RequestValidator,
};
pub use slots::{SlotClock, SlotClockConfig, MAX_SLOT_INDEX};
pub use statistics::Quartiles;
