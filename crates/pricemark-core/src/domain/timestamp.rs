use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::CoreError;

/// Human-facing request format, interpreted as UTC.
pub const REQUEST_FORMAT: &str = "MM/DD/YYYY HH:MM:SS";

const REQUEST: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year] [hour]:[minute]:[second]");
const ISO_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const ISO_SUBSECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const SQL: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
);

/// UTC instant used for observations, slot boundaries and request dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses the request format `MM/DD/YYYY HH:MM:SS`, naive ISO
    /// `YYYY-MM-DDTHH:MM:SS[.fff][Z]`, or any RFC 3339 timestamp.
    ///
    /// Naive inputs are taken as UTC; offset inputs are normalized to UTC.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();

        if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, REQUEST) {
            return Ok(Self(parsed.assume_utc()));
        }

        let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
        for format in [ISO_SECONDS, ISO_SUBSECONDS] {
            if let Ok(parsed) = PrimitiveDateTime::parse(naive, format) {
                return Ok(Self(parsed.assume_utc()));
            }
        }

        OffsetDateTime::parse(trimmed, &Rfc3339)
            .map(Self::from_offset_datetime)
            .map_err(|_| CoreError::Format {
                value: input.to_owned(),
                expected: REQUEST_FORMAT,
            })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }

    /// Elapsed time since `earlier`; negative when `earlier` is later.
    pub fn duration_since(self, earlier: Self) -> Duration {
        self.0 - earlier.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| format!("{:?}", self.0))
    }

    /// `MM/DD/YYYY HH:MM:SS`, the format requests are written in.
    pub fn format_request(self) -> String {
        self.0
            .format(REQUEST)
            .unwrap_or_else(|_| self.format_rfc3339())
    }

    /// Literal accepted by a SQL `CAST(? AS TIMESTAMP)`.
    pub fn format_sql(self) -> String {
        self.0.format(SQL).unwrap_or_else(|_| self.format_rfc3339())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
