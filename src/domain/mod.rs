//! Domain primitives shared by the HTTP layer and the purge scheduler.
//!
//! Reviews are partitioned into calendar-month buckets. Stamping a new review
//! and purging old ones both go through [`MonthBucket::from_timestamp`], so the
//! two paths can never disagree about which month is current.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical `YYYY-MM` label for the calendar month (UTC) containing `ts`.
#[must_use]
pub fn canonical_month_label(ts: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

/// First instant (00:00:00 UTC) of the calendar month after the one containing `ts`.
#[must_use]
pub fn next_month_boundary(ts: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if ts.month() == 12 {
        (ts.year() + 1, 1)
    } else {
        (ts.year(), ts.month() + 1)
    };

    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A review partition label, e.g. `2024-02`.
///
/// This is a value, never a stored entity: records carry its string form in
/// their `month_year` column.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use peerly::domain::MonthBucket;
///
/// let ts = Utc.with_ymd_and_hms(2024, 2, 14, 9, 30, 0).unwrap();
/// assert_eq!(MonthBucket::from_timestamp(ts).as_str(), "2024-02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthBucket(String);

impl MonthBucket {
    #[must_use]
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self(canonical_month_label(ts))
    }

    #[must_use]
    pub fn current() -> Self {
        Self::from_timestamp(Utc::now())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MonthBucket> for String {
    fn from(bucket: MonthBucket) -> Self {
        bucket.0
    }
}
