//! Epoch-millisecond timestamps to time-dimension fields.
//!
//! All values are naive UTC. `week` is the ISO-8601 week number while
//! `year` is the calendar year, so 2021-01-01 lands in week 53 of year 2021.
//! `weekday` counts Monday as 0 and Sunday as 6.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::records::TimeRow;

impl TimeRow {
    /// Decompose an epoch-millisecond timestamp. `None` if out of range.
    pub fn from_epoch_millis(ms: i64) -> Option<Self> {
        let start_time = DateTime::<Utc>::from_timestamp_millis(ms)?.naive_utc();
        Some(Self::from_timestamp(start_time))
    }

    pub fn from_timestamp(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().num_days_from_monday(),
        }
    }

    /// Rebuild the calendar date from the derived fields.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}
