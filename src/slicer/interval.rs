//! Interval planning over a repository's lifetime

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Nominal window length in days
pub const DEFAULT_INTERVAL_DAYS: i64 = 120;

/// Shortest step whose windows all start in distinct months, so every label
/// (and snapshot directory) is unique
pub const MIN_INTERVAL_DAYS: i64 = 31;

/// A half-open time window `[start, end)` with its directory label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label_start: NaiveDate,
    pub label_end: NaiveDate,
    pub label: String,
}

impl TimeWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Splits a date range into contiguous fixed-step windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlanner {
    step: Duration,
}

impl Default for IntervalPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_DAYS)
    }
}

impl IntervalPlanner {
    /// Planner with a step of `days`, raised to [`MIN_INTERVAL_DAYS`]
    pub fn new(days: i64) -> Self {
        Self {
            step: Duration::days(days.max(MIN_INTERVAL_DAYS)),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Windows covering `[start, end)` in chronological order.
    ///
    /// Labels truncate both ends to the first of their month, except the end
    /// of the final window, which keeps the exact requested end date. The
    /// cursor always advances to the real window end, never to the label.
    pub fn plan(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TimeWindow> {
        let mut windows = Vec::new();
        let mut cursor = start;

        while cursor < end {
            let window_end = cursor
                .checked_add_signed(self.step)
                .map_or(end, |next| next.min(end));

            let label_start = first_of_month(cursor);
            let label_end = if window_end == end {
                end.date_naive()
            } else {
                first_of_month(window_end)
            };
            let label = format!(
                "{}_to_{}",
                label_start.format("%Y-%m"),
                label_end.format("%Y-%m")
            );

            windows.push(TimeWindow {
                start: cursor,
                end: window_end,
                label_start,
                label_end,
                label,
            });
            cursor = window_end;
        }

        windows
    }
}

fn first_of_month(instant: DateTime<Utc>) -> NaiveDate {
    let date = instant.date_naive();
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_single_step_is_four_months_from_january() {
        let windows = IntervalPlanner::default().plan(utc(2021, 1, 1), utc(2021, 9, 1));

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].end, utc(2021, 5, 1));
        assert_eq!(windows[0].label, "2021-01_to_2021-05");
        assert_eq!(windows[1].start, utc(2021, 5, 1));
        assert_eq!(windows[1].end, utc(2021, 8, 29));
        assert_eq!(windows[1].label, "2021-05_to_2021-08");
        assert_eq!(windows[2].end, utc(2021, 9, 1));
        assert_eq!(windows[2].label, "2021-08_to_2021-09");
    }

    #[test]
    fn test_last_window_keeps_exact_end() {
        let windows = IntervalPlanner::default().plan(utc(2020, 3, 15), utc(2020, 4, 20));

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].label_start, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(windows[0].label_end, NaiveDate::from_ymd_opt(2020, 4, 20).unwrap());
    }

    #[test]
    fn test_intermediate_labels_truncate_to_month() {
        let windows = IntervalPlanner::default().plan(utc(2019, 6, 17), utc(2020, 6, 17));

        assert_eq!(windows[0].end, utc(2019, 10, 15));
        assert_eq!(windows[0].label_end, NaiveDate::from_ymd_opt(2019, 10, 1).unwrap());
        assert_eq!(windows[1].start, utc(2019, 10, 15));
        assert_eq!(windows[1].label_start, NaiveDate::from_ymd_opt(2019, 10, 1).unwrap());
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let planner = IntervalPlanner::default();
        assert!(planner.plan(utc(2021, 1, 1), utc(2021, 1, 1)).is_empty());
        assert!(planner.plan(utc(2021, 2, 1), utc(2021, 1, 1)).is_empty());
    }

    #[test]
    fn test_custom_step() {
        let windows = IntervalPlanner::new(31).plan(utc(2021, 1, 1), utc(2021, 3, 2));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].end, utc(2021, 2, 1));
        assert_eq!(windows[1].label, "2021-02_to_2021-03");
    }

    #[test]
    fn test_short_steps_are_raised_to_keep_labels_unique() {
        assert_eq!(IntervalPlanner::new(0).step(), Duration::days(MIN_INTERVAL_DAYS));
        assert_eq!(IntervalPlanner::new(10).step(), Duration::days(MIN_INTERVAL_DAYS));

        let windows = IntervalPlanner::new(10).plan(utc(2021, 1, 1), utc(2021, 2, 15));
        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["2021-01_to_2021-02", "2021-02_to_2021-02"]);
    }
}
