//! Planning the date window a run should fetch.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::error::{Result, SyncError};
use super::period::{DateRange, Granularity, Period, lookback_start};
use super::types::{SyncMode, WindowConfig};

/// The planned window of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Fetch every period overlapping this range.
    Range(DateRange),
    /// The cursor is already at or past the requested end.
    Empty { start: NaiveDate, end: NaiveDate },
    /// Snapshot task: fetch the current state.
    Snapshot,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        matches!(self, Window::Empty { .. })
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Window::Range(range) => write!(f, "{}", range),
            Window::Empty { start, end } => write!(f, "empty ({} > {})", start, end),
            Window::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// Inputs to window planning for one run.
#[derive(Debug, Clone, Copy)]
pub struct WindowRequest<'a> {
    pub granularity: Granularity,
    /// Lookback in granularity units, used when there is no cursor.
    pub default_lookback: u32,
    /// End of the last completed period, from the stored cursor.
    pub cursor_end: Option<DateTime<Utc>>,
    pub mode: SyncMode,
    pub config: &'a WindowConfig,
    /// Today's date (UTC), used when no end date is configured.
    pub today: NaiveDate,
}

/// Check explicit window overrides before any I/O.
pub fn validate(config: &WindowConfig, today: NaiveDate) -> Result<()> {
    let end = config.end_date.unwrap_or(today);
    if let Some(start) = config.start_date
        && start > end
    {
        return Err(SyncError::validation(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date given as a window override.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| SyncError::validation(format!("invalid date {:?}: {}", value, e)))
}

/// Build window overrides from optional `from`/`to` strings.
pub fn parse_overrides(from: Option<&str>, to: Option<&str>) -> Result<WindowConfig> {
    Ok(WindowConfig {
        start_date: from.map(parse_date).transpose()?,
        end_date: to.map(parse_date).transpose()?,
    })
}

fn align(granularity: Granularity, date: NaiveDate) -> NaiveDate {
    Period::containing(granularity, date)
        .map(|p| p.start)
        .unwrap_or(date)
}

/// Plan the inclusive window for one run.
///
/// - An explicit start date wins over cursor and lookback.
/// - With a cursor (incremental mode), the window starts at the period that
///   follows `cursor_end`. A cursor inside a month restarts that month.
/// - Without one (or in full mode), it starts `default_lookback` units
///   before the end date.
///
/// Starts are aligned to their period's first day so period overwrites
/// always see a whole period.
pub fn plan_window(request: WindowRequest<'_>) -> Result<Window> {
    let granularity = request.granularity;
    if !granularity.is_windowed() {
        return Ok(Window::Snapshot);
    }

    validate(request.config, request.today)?;
    let end = request.config.end_date.unwrap_or(request.today);

    let start = match (request.config.start_date, request.cursor_end, request.mode) {
        (Some(start), _, _) => align(granularity, start),
        (None, Some(cursor_end), SyncMode::Incremental) => {
            let resume = (cursor_end + Duration::milliseconds(1)).date_naive();
            align(granularity, resume)
        }
        _ => {
            let cold = align(
                granularity,
                lookback_start(granularity, end, request.default_lookback),
            );
            cold.min(end)
        }
    };

    Ok(match DateRange::new(start, end) {
        Some(range) => Window::Range(range),
        None => Window::Empty { start, end },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::period::end_of_day;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request<'a>(
        granularity: Granularity,
        cursor_end: Option<DateTime<Utc>>,
        config: &'a WindowConfig,
    ) -> WindowRequest<'a> {
        WindowRequest {
            granularity,
            default_lookback: 90,
            cursor_end,
            mode: SyncMode::Incremental,
            config,
            today: d(2024, 3, 10),
        }
    }

    #[test]
    fn test_parse_overrides() {
        let config = parse_overrides(Some("2024-02-01"), None).unwrap();
        assert_eq!(config.start_date, Some(d(2024, 2, 1)));
        assert_eq!(config.end_date, None);

        let err = parse_overrides(None, Some("2024-02-30")).unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert!(parse_date("03/10/2024").is_err());
    }

    #[test]
    fn test_cold_start_uses_lookback() {
        let config = WindowConfig::default();
        let window = plan_window(request(Granularity::Day, None, &config)).unwrap();
        assert_eq!(
            window,
            Window::Range(DateRange::new(d(2023, 12, 11), d(2024, 3, 10)).unwrap())
        );
    }

    #[test]
    fn test_warm_start_ignores_lookback() {
        let config = WindowConfig {
            end_date: Some(d(2024, 3, 15)),
            ..Default::default()
        };
        let mut req = request(Granularity::Day, Some(end_of_day(d(2024, 3, 10))), &config);
        req.default_lookback = 1;
        let window = plan_window(req).unwrap();
        let Window::Range(range) = window else {
            panic!("expected a range, got {window:?}");
        };
        assert_eq!(range.start, d(2024, 3, 11));
        assert_eq!(range.end, d(2024, 3, 15));
        assert_eq!(range.days(), 5);
    }

    #[test]
    fn test_cursor_at_end_yields_empty_window() {
        let config = WindowConfig::default();
        let window =
            plan_window(request(Granularity::Day, Some(end_of_day(d(2024, 3, 10))), &config))
                .unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_month_cursor_mid_month_restarts_month() {
        let config = WindowConfig::default();
        let window = plan_window(request(
            Granularity::Month,
            Some(end_of_day(d(2024, 3, 5))),
            &config,
        ))
        .unwrap();
        assert_eq!(
            window,
            Window::Range(DateRange::new(d(2024, 3, 1), d(2024, 3, 10)).unwrap())
        );
    }

    #[test]
    fn test_full_mode_ignores_cursor() {
        let config = WindowConfig::default();
        let mut req = request(Granularity::Day, Some(end_of_day(d(2024, 3, 10))), &config);
        req.mode = SyncMode::Full;
        req.default_lookback = 2;
        assert_eq!(
            plan_window(req).unwrap(),
            Window::Range(DateRange::new(d(2024, 3, 8), d(2024, 3, 10)).unwrap())
        );
    }

    #[test]
    fn test_explicit_start_overrides_cursor() {
        let config = WindowConfig {
            start_date: Some(d(2024, 2, 14)),
            end_date: Some(d(2024, 3, 2)),
        };
        let window = plan_window(request(
            Granularity::Month,
            Some(end_of_day(d(2024, 3, 1))),
            &config,
        ))
        .unwrap();
        assert_eq!(
            window,
            Window::Range(DateRange::new(d(2024, 2, 1), d(2024, 3, 2)).unwrap())
        );
    }

    #[test]
    fn test_inverted_explicit_range_is_validation_error() {
        let config = WindowConfig {
            start_date: Some(d(2024, 3, 12)),
            end_date: Some(d(2024, 3, 2)),
        };
        let err = plan_window(request(Granularity::Day, None, &config)).unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
    }

    #[test]
    fn test_snapshot_tasks_have_no_window() {
        let config = WindowConfig::default();
        assert_eq!(
            plan_window(request(Granularity::Snapshot, None, &config)).unwrap(),
            Window::Snapshot
        );
    }

    #[test]
    fn test_zero_lookback_fetches_only_end_period() {
        let config = WindowConfig::default();
        let mut req = request(Granularity::Day, None, &config);
        req.default_lookback = 0;
        assert_eq!(
            plan_window(req).unwrap(),
            Window::Range(DateRange::new(d(2024, 3, 10), d(2024, 3, 10)).unwrap())
        );
    }
}
