//! Calendar periods and inclusive date ranges.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Time granularity of a task's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One elementary period per calendar day.
    Day,
    /// One elementary period per calendar month.
    Month,
    /// No time dimension: every run fetches the full current state.
    #[serde(rename = "none")]
    Snapshot,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Snapshot => "none",
        }
    }

    pub fn is_windowed(self) -> bool {
        !matches!(self, Granularity::Snapshot)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Overlap of two ranges.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        DateRange::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// Last representable instant of a day, at millisecond precision.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// One elementary day or month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// The period of `granularity` that contains `date`.
    ///
    /// Snapshot tasks have no periods and yield `None`.
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Option<Self> {
        match granularity {
            Granularity::Day => Some(Self {
                granularity,
                start: date,
                end: date,
            }),
            Granularity::Month => Some(Self {
                granularity,
                start: first_of_month(date),
                end: last_of_month(date),
            }),
            Granularity::Snapshot => None,
        }
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Option<Self> {
        let next_start = self.end.succ_opt()?;
        Self::containing(self.granularity, next_start)
    }

    /// Storage key: `2024-03-10` for days, `2024-03` for months.
    pub fn key(&self) -> String {
        match self.granularity {
            Granularity::Month => self.start.format("%Y-%m").to_string(),
            _ => self.start.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Elementary periods overlapping `range`, in order.
    pub fn covering(granularity: Granularity, range: DateRange) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = Self::containing(granularity, range.start);
        while let Some(period) = current {
            if period.start > range.end {
                break;
            }
            periods.push(period);
            current = period.next();
        }
        periods
    }
}

/// Step back `units` periods from `date`.
pub fn lookback_start(granularity: Granularity, date: NaiveDate, units: u32) -> NaiveDate {
    match granularity {
        Granularity::Day => date
            .checked_sub_signed(Duration::days(i64::from(units)))
            .unwrap_or(NaiveDate::MIN),
        Granularity::Month => date
            .checked_sub_months(Months::new(units))
            .unwrap_or(NaiveDate::MIN),
        Granularity::Snapshot => date,
    }
}
