//! Time-window resolution for the mood chart.
//!
//! This module maps a window selection and a pivot date onto exact calendar
//! boundaries. All arithmetic is calendar-based (`NaiveDate` + month indices),
//! never duration-based, so month lengths cannot make a window drift.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source of "today" for window resolution.
pub trait Clock: Send + Sync {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Granularity of the visible chart window.
///
/// String forms match the values of the window selector
/// (`day`, `month`, `quarter`, `bi-annual`, `year`, `all-time`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    /// Three days centred on one day
    Day,
    /// Calendar month
    #[default]
    Month,
    /// Calendar quarter
    Quarter,
    /// Half year split at the Jun/Jul boundary
    BiAnnual,
    /// Calendar year
    Year,
    /// Earliest record to today
    AllTime,
}

impl WindowType {
    /// Calendar months covered by one navigation step.
    ///
    /// `None` for windows that cannot be stepped.
    #[must_use]
    pub const fn step_months(self) -> Option<i32> {
        match self {
            Self::Month => Some(1),
            Self::Quarter => Some(3),
            Self::BiAnnual => Some(6),
            Self::Year => Some(12),
            Self::Day | Self::AllTime => None,
        }
    }

    /// Whether the step buttons apply to this window.
    #[must_use]
    pub const fn is_steppable(self) -> bool {
        self.step_months().is_some()
    }

    /// Selector value for this window.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::BiAnnual => "bi-annual",
            Self::Year => "year",
            Self::AllTime => "all-time",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Month => "Month",
            Self::Quarter => "Quarter",
            Self::BiAnnual => "Half Year",
            Self::Year => "Year",
            Self::AllTime => "All Time",
        }
    }

    /// All window types, in selector order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Day,
            Self::Month,
            Self::Quarter,
            Self::BiAnnual,
            Self::Year,
            Self::AllTime,
        ]
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| Error::InvalidWindowType(s.to_string()))
    }
}

/// An inclusive range of calendar dates. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting reversed bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::date_out_of_range(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Get the start date as a SQL-friendly string (YYYY-MM-DD format).
    #[must_use]
    pub fn start_sql(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Get the end date as a SQL-friendly string (YYYY-MM-DD format).
    #[must_use]
    pub fn end_sql(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Convert to a tuple of SQL strings `(start, end)`.
    #[must_use]
    pub fn to_sql_tuple(&self) -> (String, String) {
        (self.start_sql(), self.end_sql())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} – {}", self.start_sql(), self.end_sql())
    }
}

/// Resolves window selections into concrete date ranges.
#[derive(Clone)]
pub struct WindowResolver {
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for WindowResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowResolver")
            .field("today", &self.clock.today())
            .finish()
    }
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl WindowResolver {
    /// Create a resolver reading "today" from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Create a resolver pinned to `today`.
    #[must_use]
    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(Arc::new(FixedClock(today)))
    }

    /// The current date according to the resolver's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// The calendar period of `window` containing `pivot`.
    ///
    /// `earliest_record` is only consulted for [`WindowType::AllTime`].
    pub fn resolve(
        &self,
        window: WindowType,
        pivot: NaiveDate,
        earliest_record: Option<NaiveDate>,
    ) -> Result<DateRange> {
        resolve_at(window, pivot, earliest_record, self.today())
    }

    /// The period of `window` containing today: forward navigation may reach
    /// its end but never pass it.
    pub fn absolute_max_range(&self, window: WindowType) -> Result<DateRange> {
        let today = self.today();
        resolve_at(window, today, Some(today), today)
    }
}

/// Resolve `window` around `pivot` with an explicit `today`.
pub fn resolve_at(
    window: WindowType,
    pivot: NaiveDate,
    earliest_record: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange> {
    match window {
        WindowType::Day => {
            let start = pivot
                .pred_opt()
                .ok_or_else(|| Error::date_out_of_range(format!("no day before {pivot}")))?;
            let end = pivot
                .succ_opt()
                .ok_or_else(|| Error::date_out_of_range(format!("no day after {pivot}")))?;
            DateRange::new(start, end)
        }
        WindowType::Month => month_bounds(pivot.year(), pivot.month()),
        WindowType::Quarter => {
            let first_month = (pivot.month0() / 3) * 3 + 1;
            DateRange::new(
                ymd(pivot.year(), first_month, 1)?,
                last_day_of_month(pivot.year(), first_month + 2)?,
            )
        }
        WindowType::BiAnnual => {
            // June always has 30 days, so the split needs no leap-year handling.
            if pivot.month() <= 6 {
                DateRange::new(ymd(pivot.year(), 1, 1)?, ymd(pivot.year(), 6, 30)?)
            } else {
                DateRange::new(ymd(pivot.year(), 7, 1)?, ymd(pivot.year(), 12, 31)?)
            }
        }
        WindowType::Year => DateRange::new(ymd(pivot.year(), 1, 1)?, ymd(pivot.year(), 12, 31)?),
        WindowType::AllTime => {
            let earliest = earliest_record.ok_or(Error::MissingEarliestRecord)?;
            DateRange::new(earliest, today)
        }
    }
}

/// Move `date` by `delta` calendar months, clamping the day to the target
/// month's length.
pub fn shift_months(date: NaiveDate, delta: i32) -> Result<NaiveDate> {
    let month_index = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(delta);
    let year = i32::try_from(month_index.div_euclid(12))
        .map_err(|_| Error::date_out_of_range(format!("{date} shifted by {delta} months")))?;
    // rem_euclid(12) is always in 0..12
    let month = u32::try_from(month_index.rem_euclid(12)).unwrap_or(0) + 1;
    let last = last_day_of_month(year, month)?;
    ymd(year, month, date.day().min(last.day()))
}

fn month_bounds(year: i32, month: u32) -> Result<DateRange> {
    DateRange::new(ymd(year, month, 1)?, last_day_of_month(year, month)?)
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let first_of_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    first_of_next
        .pred_opt()
        .ok_or_else(|| Error::date_out_of_range(format!("{year}-{month:02} has no last day")))
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::date_out_of_range(format!("{year}-{month:02}-{day:02}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    fn resolver() -> WindowResolver {
        WindowResolver::fixed(d(2023, 7, 10))
    }

    #[test]
    fn test_month_february_non_leap() {
        let r = resolver().resolve(WindowType::Month, d(2021, 2, 15), None).unwrap();
        assert_eq!(r, range(d(2021, 2, 1), d(2021, 2, 28)));
    }

    #[test]
    fn test_month_february_leap() {
        let r = resolver().resolve(WindowType::Month, d(2024, 2, 29), None).unwrap();
        assert_eq!(r, range(d(2024, 2, 1), d(2024, 2, 29)));
    }

    #[test]
    fn test_quarter() {
        let r = resolver().resolve(WindowType::Quarter, d(2021, 2, 15), None).unwrap();
        assert_eq!(r, range(d(2021, 1, 1), d(2021, 3, 31)));

        let r = resolver().resolve(WindowType::Quarter, d(2021, 12, 31), None).unwrap();
        assert_eq!(r, range(d(2021, 10, 1), d(2021, 12, 31)));
    }

    #[test]
    fn test_bi_annual_halves() {
        let first = resolver().resolve(WindowType::BiAnnual, d(2022, 6, 30), None).unwrap();
        assert_eq!(first, range(d(2022, 1, 1), d(2022, 6, 30)));

        let second = resolver().resolve(WindowType::BiAnnual, d(2022, 7, 1), None).unwrap();
        assert_eq!(second, range(d(2022, 7, 1), d(2022, 12, 31)));
    }

    #[test]
    fn test_year() {
        let r = resolver().resolve(WindowType::Year, d(2020, 5, 5), None).unwrap();
        assert_eq!(r, range(d(2020, 1, 1), d(2020, 12, 31)));
    }

    #[test]
    fn test_day_window_spans_three_days() {
        let r = resolver().resolve(WindowType::Day, d(2021, 3, 1), None).unwrap();
        assert_eq!(r, range(d(2021, 2, 28), d(2021, 3, 2)));
        assert_eq!(r.num_days(), 3);
    }

    #[test]
    fn test_all_time_runs_to_today() {
        let r = resolver()
            .resolve(WindowType::AllTime, d(2020, 1, 1), Some(d(2019, 3, 1)))
            .unwrap();
        assert_eq!(r, range(d(2019, 3, 1), d(2023, 7, 10)));
    }

    #[test]
    fn test_all_time_without_earliest_record() {
        let err = resolver()
            .resolve(WindowType::AllTime, d(2020, 1, 1), None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingEarliestRecord));
    }

    #[test]
    fn test_all_time_earliest_in_future() {
        let err = resolver()
            .resolve(WindowType::AllTime, d(2020, 1, 1), Some(d(2024, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, Error::DateOutOfRange(_)));
    }

    #[test]
    fn test_absolute_max_range() {
        let r = resolver();
        assert_eq!(
            r.absolute_max_range(WindowType::BiAnnual).unwrap(),
            range(d(2023, 7, 1), d(2023, 12, 31))
        );
        assert_eq!(
            r.absolute_max_range(WindowType::Quarter).unwrap(),
            range(d(2023, 7, 1), d(2023, 9, 30))
        );
    }

    #[test]
    fn test_step_months() {
        assert_eq!(WindowType::Month.step_months(), Some(1));
        assert_eq!(WindowType::Quarter.step_months(), Some(3));
        assert_eq!(WindowType::BiAnnual.step_months(), Some(6));
        assert_eq!(WindowType::Year.step_months(), Some(12));
        assert_eq!(WindowType::Day.step_months(), None);
        assert_eq!(WindowType::AllTime.step_months(), None);
    }

    #[test]
    fn test_shift_months_clamps_day() {
        assert_eq!(shift_months(d(2021, 1, 31), 1).unwrap(), d(2021, 2, 28));
        assert_eq!(shift_months(d(2021, 3, 31), -1).unwrap(), d(2021, 2, 28));
        assert_eq!(shift_months(d(2021, 1, 15), -13).unwrap(), d(2019, 12, 15));
    }

    #[test]
    fn test_parse_window_names() {
        for window in WindowType::all() {
            assert_eq!(window.as_str().parse::<WindowType>().unwrap(), *window);
        }
        let err = "fortnight".parse::<WindowType>().unwrap_err();
        assert!(matches!(err, Error::InvalidWindowType(name) if name == "fortnight"));
    }

    #[test]
    fn test_serde_names_match_selector() {
        let json = serde_json::to_string(&WindowType::BiAnnual).unwrap();
        assert_eq!(json, "\"bi-annual\"");
        let parsed: WindowType = serde_json::from_str("\"all-time\"").unwrap();
        assert_eq!(parsed, WindowType::AllTime);
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(DateRange::new(d(2021, 2, 2), d(2021, 2, 1)).is_err());
    }

    #[test]
    fn test_sql_tuple() {
        let r = range(d(2024, 1, 1), d(2024, 12, 31));
        assert_eq!(
            r.to_sql_tuple(),
            ("2024-01-01".to_string(), "2024-12-31".to_string())
        );
    }

    fn bounded_window() -> impl Strategy<Value = WindowType> {
        prop_oneof![
            Just(WindowType::Day),
            Just(WindowType::Month),
            Just(WindowType::Quarter),
            Just(WindowType::BiAnnual),
            Just(WindowType::Year),
        ]
    }

    proptest! {
        #[test]
        fn prop_resolved_range_is_ordered_and_contains_pivot(
            window in bounded_window(),
            days in 0i64..40_000,
        ) {
            let pivot = d(1950, 1, 1) + chrono::Duration::days(days);
            let r = resolver().resolve(window, pivot, None).unwrap();
            prop_assert!(r.start <= r.end);
            prop_assert!(r.contains(pivot));
        }

        #[test]
        fn prop_resolve_is_idempotent_on_its_own_bounds(
            window in bounded_window(),
            days in 0i64..40_000,
        ) {
            prop_assume!(window != WindowType::Day);
            let pivot = d(1950, 1, 1) + chrono::Duration::days(days);
            let r = resolver().resolve(window, pivot, None).unwrap();
            prop_assert_eq!(resolver().resolve(window, r.start, None).unwrap(), r);
            prop_assert_eq!(resolver().resolve(window, r.end, None).unwrap(), r);
        }
    }
}
