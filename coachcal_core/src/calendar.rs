//! Pure calendar arithmetic.
//!
//! Weeks start on Monday and every day of week handed to other modules is
//! numbered 1 (Monday) through 7 (Sunday). Nothing here reads the clock:
//! "today" is always supplied by the caller.

use crate::DayOfWeek;
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Number of cells in a month grid (6 rows x 7 columns)
pub const MONTH_GRID_CELLS: usize = 42;

/// One cell of a calendar view; derived, never persisted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_current_month: bool,
    pub day_of_week: DayOfWeek,
}

impl CalendarDay {
    fn new(date: NaiveDate, today: NaiveDate, month: (i32, u32)) -> Self {
        CalendarDay {
            date,
            is_today: date == today,
            is_current_month: year_month(date) == month,
            day_of_week: DayOfWeek::of(date),
        }
    }
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(DayOfWeek::of(date).number() - 1);
    date - Days::new(offset)
}

/// Monday 00:00 of the week containing `datetime`
pub fn week_start_at(datetime: NaiveDateTime) -> NaiveDateTime {
    week_start(datetime.date()).and_time(chrono::NaiveTime::MIN)
}

/// Whether two instants fall on the same calendar date in their own zone
///
/// No conversion is performed; normalize both values to one zone first.
pub fn is_same_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Calendar date of a UTC instant as seen from `offset`
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// `(year, month)` bucket key of a date
pub fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Normalize an arbitrary `(year, month)` pair the way date arithmetic does
///
/// Month 13 is January of the following year, month 0 is December of the
/// previous one, and so on in both directions.
pub fn normalize_year_month(year: i32, month: i32) -> (i32, u32) {
    let index = year * 12 + (month - 1);
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// First day of a (possibly out-of-range) month
pub fn first_of_month(year: i32, month: i32) -> NaiveDate {
    let (y, m) = normalize_year_month(year, month);
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(NaiveDate::MIN)
}

/// Number of days in a (possibly out-of-range) month
pub fn days_in_month(year: i32, month: i32) -> u32 {
    let start = first_of_month(year, month);
    let next = first_of_month(year, month + 1);
    (next - start).num_days() as u32
}

/// 42-cell month grid, padded with the surrounding months' days
///
/// Padding cells never carry `is_today`, so a grid has exactly one today
/// cell when today falls inside the month and none otherwise.
pub fn month_grid(year: i32, month: i32, today: NaiveDate) -> Vec<CalendarDay> {
    let first = first_of_month(year, month);
    let key = year_month(first);
    let grid_start = week_start(first);

    (0..MONTH_GRID_CELLS as u64)
        .map(|i| {
            let mut day = CalendarDay::new(grid_start + Days::new(i), today, key);
            day.is_today &= day.is_current_month;
            day
        })
        .collect()
}

/// The seven days of the week containing `date`, Monday first
///
/// `is_current_month` is relative to the month `date` itself falls in.
pub fn week_days(date: NaiveDate, today: NaiveDate) -> Vec<CalendarDay> {
    let key = year_month(date);
    let start = week_start(date);

    (0..7)
        .map(|i| CalendarDay::new(start + Days::new(i), today, key))
        .collect()
}

/// A single-cell view for the day view
pub fn single_day(date: NaiveDate, today: NaiveDate) -> CalendarDay {
    CalendarDay::new(date, today, year_month(date))
}
