//! Pure calendar arithmetic shared by every builder.
//!
//! All functions take and return immutable `NaiveDate` values and are total:
//! any date chrono can represent produces a value.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

/// Largest shift `closest_weekday_last_year` applies to the naive one-year-back date.
pub const MAX_WEEKDAY_DRIFT: i64 = 3;

/// ISO-8601 week number (1-53). Week 1 is the week containing the year's first Thursday.
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// The ISO week-numbering year, which differs from the calendar year for a
/// few days around January 1st.
pub fn iso_year(date: NaiveDate) -> i32 {
    date.iso_week().year()
}

/// `ceil(day_of_month / 7)`, always in 1..=5.
pub fn week_of_month(day_of_month: u32) -> u32 {
    day_of_month.max(1).div_ceil(7)
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn month_key_of(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn first_of_year(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Same month and day one year earlier. February 29th maps to February 28th.
pub fn same_day_last_year(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(12)).unwrap_or(date)
}

/// Subtracts one year, then moves at most three days in either direction so
/// the result falls on the same weekday as `date`.
///
/// A drift of exactly 3 days is applied as is; a drift of 4 or more wraps
/// around the week (e.g. +4 becomes -3).
pub fn closest_weekday_last_year(date: NaiveDate) -> NaiveDate {
    let naive = same_day_last_year(date);
    let target = date.weekday().num_days_from_sunday() as i64;
    let actual = naive.weekday().num_days_from_sunday() as i64;

    let mut diff = target - actual;
    if diff > MAX_WEEKDAY_DRIFT {
        diff -= 7;
    } else if diff < -MAX_WEEKDAY_DRIFT {
        diff += 7;
    }

    add_days(naive, diff)
}

/// The most recent `first_day` on or before `date`.
pub fn start_of_week(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (date.weekday().num_days_from_sunday() + 7
        - first_day.num_days_from_sunday())
        % 7;
    add_days(date, -(offset as i64))
}

/// Moves a (year, month) pair by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

pub fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}

/// "October 2026"
pub fn month_label(year: i32, month: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date.format("%B %Y").to_string(),
        None => month_key_of(year, month),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_iso_week_year_boundaries() {
        // Thursday January 1st: week 1 of the same year
        assert_eq!(iso_week(d(2026, 1, 1)), 1);
        assert_eq!(iso_year(d(2026, 1, 1)), 2026);

        // Friday January 1st: belongs to the last week of the previous ISO year
        assert_eq!(iso_week(d(2021, 1, 1)), 53);
        assert_eq!(iso_year(d(2021, 1, 1)), 2020);
        assert_eq!(iso_week(d(2021, 1, 4)), 1);

        // Tuesday December 31st: already week 1 of the next ISO year
        assert_eq!(iso_week(d(2024, 12, 31)), 1);
        assert_eq!(iso_year(d(2024, 12, 31)), 2025);

        assert_eq!(iso_week(d(2024, 1, 1)), 1);
        assert_eq!(iso_week(d(2026, 10, 19)), 43);
    }

    #[test]
    fn test_week_of_month() {
        assert_eq!(week_of_month(1), 1);
        assert_eq!(week_of_month(7), 1);
        assert_eq!(week_of_month(8), 2);
        assert_eq!(week_of_month(28), 4);
        assert_eq!(week_of_month(29), 5);
        assert_eq!(week_of_month(31), 5);
    }

    #[test]
    fn test_closest_weekday_last_year_matches_weekday() {
        let mut date = d(2024, 1, 1);
        let end = d(2027, 12, 31);
        while date <= end {
            let aligned = closest_weekday_last_year(date);
            assert_eq!(aligned.weekday(), date.weekday(), "weekday mismatch for {}", date);

            let drift = (aligned - same_day_last_year(date)).num_days().abs();
            assert!(drift <= MAX_WEEKDAY_DRIFT, "drift {} for {}", drift, date);

            date = add_days(date, 1);
        }
    }

    #[test]
    fn test_closest_weekday_last_year_examples() {
        // Monday 2026-10-19 -> naive 2025-10-19 is a Sunday -> +1 day
        assert_eq!(closest_weekday_last_year(d(2026, 10, 19)), d(2025, 10, 20));
        // Leap day falls back to Feb 28 before alignment
        let aligned = closest_weekday_last_year(d(2024, 2, 29));
        assert_eq!(aligned.weekday(), Weekday::Thu);
        assert_eq!(aligned, d(2023, 3, 2));
    }

    #[test]
    fn test_same_day_last_year_leap() {
        assert_eq!(same_day_last_year(d(2024, 2, 29)), d(2023, 2, 28));
        assert_eq!(same_day_last_year(d(2026, 3, 15)), d(2025, 3, 15));
    }

    #[test]
    fn test_start_of_week() {
        // 2026-10-19 is a Monday
        assert_eq!(start_of_week(d(2026, 10, 19), Weekday::Sun), d(2026, 10, 18));
        assert_eq!(start_of_week(d(2026, 10, 19), Weekday::Mon), d(2026, 10, 19));
        assert_eq!(start_of_week(d(2026, 10, 18), Weekday::Mon), d(2026, 10, 12));
    }

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(2026, 10, -5), (2026, 5));
        assert_eq!(shift_month(2026, 2, -3), (2025, 11));
        assert_eq!(shift_month(2026, 1, -12), (2025, 1));
        assert_eq!(shift_month(2025, 12, 1), (2026, 1));
    }

    #[test]
    fn test_labels() {
        assert_eq!(month_label(2026, 10), "October 2026");
        assert_eq!(month_abbrev(2), "Feb");
        assert_eq!(month_key(d(2026, 3, 9)), "2026-03");
        assert_eq!(weekday_label(Weekday::Sun), "Sun");
    }
}
