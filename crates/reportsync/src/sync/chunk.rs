//! Splitting a planned window into fetch units.
//!
//! Persistence always works one elementary period at a time, so every unit
//! is one period. Within a period, the fetch range is further split so no
//! request spans more days than the endpoint allows.

use chrono::{DateTime, Duration, Utc};

use super::period::{DateRange, Granularity, Period, end_of_day};
use super::window::Window;

/// One period to fetch and persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    /// The elementary period, `None` for snapshots.
    pub period: Option<Period>,
    /// Period storage key, empty for snapshots.
    pub period_key: String,
    /// Upstream-legal date ranges; empty for snapshots.
    pub segments: Vec<DateRange>,
    /// Cursor position once this unit completes.
    pub completes_through: DateTime<Utc>,
}

/// Split `range` into ordered, contiguous sub-ranges of at most
/// `max_span_days` days each.
///
/// Without a limit (or with a zero limit) the range is returned whole.
pub fn split_span(range: DateRange, max_span_days: Option<u32>) -> Vec<DateRange> {
    let Some(max_span) = max_span_days.filter(|&n| n > 0) else {
        return vec![range];
    };

    let step = Duration::days(i64::from(max_span) - 1);
    let mut segments = Vec::new();
    let mut start = range.start;
    loop {
        let end = start
            .checked_add_signed(step)
            .map_or(range.end, |e| e.min(range.end));
        segments.push(DateRange { start, end });
        match end.succ_opt() {
            Some(next) if end < range.end => start = next,
            _ => break,
        }
    }
    segments
}

/// Plan the fetch units of a window.
///
/// `snapshot_at` is the cursor position recorded for snapshot tasks.
pub fn plan_units(
    window: &Window,
    granularity: Granularity,
    max_span_days: Option<u32>,
    snapshot_at: DateTime<Utc>,
) -> Vec<FetchUnit> {
    match window {
        Window::Empty { .. } => Vec::new(),
        Window::Snapshot => vec![FetchUnit {
            period: None,
            period_key: String::new(),
            segments: Vec::new(),
            completes_through: snapshot_at,
        }],
        Window::Range(range) => Period::covering(granularity, *range)
            .into_iter()
            .map(|period| FetchUnit {
                period_key: period.key(),
                segments: split_span(period.range(), max_span_days),
                // A period still running at the window end is only complete
                // up to that end; the next run fetches it again.
                completes_through: end_of_day(period.end.min(range.end)),
                period: Some(period),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_split_span_ten_days_by_seven() {
        let segments = split_span(range(d(2024, 3, 1), d(2024, 3, 10)), Some(7));
        assert_eq!(
            segments,
            vec![
                range(d(2024, 3, 1), d(2024, 3, 7)),
                range(d(2024, 3, 8), d(2024, 3, 10)),
            ]
        );
    }

    #[test]
    fn test_split_span_covers_range_exactly() {
        let whole = range(d(2024, 1, 1), d(2024, 3, 31));
        for span in [1, 2, 7, 15, 31, 90, 365] {
            let segments = split_span(whole, Some(span));
            assert_eq!(segments.first().unwrap().start, whole.start);
            assert_eq!(segments.last().unwrap().end, whole.end);
            for pair in segments.windows(2) {
                assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
            }
            assert!(segments.iter().all(|s| s.days() <= i64::from(span)));
        }
    }

    #[test]
    fn test_split_span_without_limit_returns_whole_range() {
        let whole = range(d(2024, 3, 1), d(2024, 3, 10));
        assert_eq!(split_span(whole, None), vec![whole]);
        assert_eq!(split_span(whole, Some(0)), vec![whole]);
    }

    #[test]
    fn test_plan_units_one_per_day() {
        let window = Window::Range(range(d(2024, 3, 11), d(2024, 3, 15)));
        let units = plan_units(&window, Granularity::Day, None, Utc::now());
        assert_eq!(units.len(), 5);
        assert_eq!(units[0].period_key, "2024-03-11");
        assert_eq!(units[4].completes_through, end_of_day(d(2024, 3, 15)));
    }

    #[test]
    fn test_plan_units_month_segments_and_open_month_cursor() {
        let window = Window::Range(range(d(2024, 2, 1), d(2024, 3, 10)));
        let units = plan_units(&window, Granularity::Month, Some(15), Utc::now());
        assert_eq!(units.len(), 2);

        assert_eq!(units[0].period_key, "2024-02");
        assert_eq!(
            units[0].segments,
            vec![
                range(d(2024, 2, 1), d(2024, 2, 15)),
                range(d(2024, 2, 16), d(2024, 2, 29)),
            ]
        );
        assert_eq!(units[0].completes_through, end_of_day(d(2024, 2, 29)));

        // March is still open: cursor stops at the window end.
        assert_eq!(units[1].segments.len(), 3);
        assert_eq!(units[1].completes_through, end_of_day(d(2024, 3, 10)));
    }

    #[test]
    fn test_plan_units_snapshot_and_empty() {
        let now = Utc::now();
        let units = plan_units(&Window::Snapshot, Granularity::Snapshot, None, now);
        assert_eq!(units.len(), 1);
        assert!(units[0].period_key.is_empty());
        assert_eq!(units[0].completes_through, now);

        let empty = Window::Empty {
            start: d(2024, 3, 11),
            end: d(2024, 3, 10),
        };
        assert!(plan_units(&empty, Granularity::Day, None, now).is_empty());
    }
}
