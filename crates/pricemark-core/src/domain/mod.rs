//! # Domain Models
//!
//! Value types shared by the slot clock, the statistics and the reporter.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PriceObservation`] | Immutable priced fact tagged with portfolio/owner/instrument |
//! | [`PriceFilter`] | Optional dimensions AND-ed together; absent fields are wildcards |
//! | [`TimeWindow`] | Half-open `[start, end)` interval |
//! | [`StatResult`] | One computed price labelled with the start of the interval it summarizes |
//! | [`UtcDateTime`] | UTC instant |

mod models;
mod timestamp;

pub(crate) use models::non_blank;
pub use models::{PriceFilter, PriceObservation, StatResult, TimeWindow};
pub use timestamp::{UtcDateTime, REQUEST_FORMAT};
