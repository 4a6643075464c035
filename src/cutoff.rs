//! Import time limit parsing.

use chrono::{NaiveDate, NaiveTime};

use crate::error::{TransferError, TransferResult};

/// Upper time bound for imported samples, inclusive.
///
/// Parsed from a `YYYY-MM-DD` date: the bound is midnight UTC *after* that
/// date, so every sample generated during the named day is still included.
/// Without a date the cutoff is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff(i64);

impl Cutoff {
    /// No limit; every sample passes.
    pub const UNLIMITED: Cutoff = Cutoff(i64::MAX);

    /// Build a cutoff from a raw POSIX timestamp.
    pub fn from_timestamp(t: i64) -> Self {
        Cutoff(t)
    }

    /// Parse a `YYYY-MM-DD` date into an inclusive-day cutoff.
    pub fn parse(date: &str) -> TransferResult<Self> {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| TransferError::InvalidDate(date.to_owned()))?;
        let midnight = day.and_time(NaiveTime::MIN).and_utc().timestamp();
        Ok(Cutoff(midnight + 86_400))
    }

    /// Parse an optional date, defaulting to [`Cutoff::UNLIMITED`].
    pub fn parse_opt(date: Option<&str>) -> TransferResult<Self> {
        date.map_or(Ok(Self::UNLIMITED), Self::parse)
    }

    /// True when a sample at `t` falls within the import boundary.
    pub fn includes(self, t: i64) -> bool {
        t <= self.0
    }

    /// True when no limit was set.
    pub fn is_unlimited(self) -> bool {
        self.0 == i64::MAX
    }
}
