//! Date parsing for invoice dates.

use chrono::NaiveDate;

use super::patterns::{DATE_DAY_MONTH_NAME, DATE_MONTH_NAME, DATE_NUMERIC};
use crate::models::config::DateOrder;

/// Parse a date string in any of the supported layouts.
///
/// Numeric dates with a leading four-digit year read as `YYYY-MM-DD`.
/// Otherwise `order` decides between `MM/DD` and `DD/MM`, unless the first
/// part cannot be a month. Month names may be full or abbreviated.
pub fn parse_date(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(caps) = DATE_NUMERIC.captures(s) {
        let (a, b, c) = (&caps[1], &caps[2], &caps[3]);
        if a.len() == 4 {
            return NaiveDate::from_ymd_opt(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?);
        }
        if c.len() == 3 || c.len() > 4 {
            return None;
        }

        let first: u32 = a.parse().ok()?;
        let second: u32 = b.parse().ok()?;
        let year = parse_year(c)?;

        let (month, day) = match order {
            DateOrder::MonthFirst if first > 12 => (second, first),
            DateOrder::MonthFirst => (first, second),
            DateOrder::DayFirst if second > 12 => (first, second),
            DateOrder::DayFirst => (second, first),
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_MONTH_NAME.captures(s) {
        let month = month_number(&caps[1])?;
        return NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[2].parse().ok()?);
    }

    if let Some(caps) = DATE_DAY_MONTH_NAME.captures(s) {
        let month = month_number(&caps[2])?;
        return NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[1].parse().ok()?);
    }

    None
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match (s.len(), year) {
        // Two-digit year: 00-50 is this century, 51-99 the last
        (2, 0..=50) => 2000 + year,
        (2, _) => 1900 + year,
        _ => year,
    })
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    let prefix = name.get(..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_date("2024-12-15", DateOrder::MonthFirst), ymd(2024, 12, 15));
        assert_eq!(parse_date("2024/1/5", DateOrder::DayFirst), ymd(2024, 1, 5));
    }

    #[test]
    fn test_parse_numeric_date_order() {
        assert_eq!(parse_date("03/04/2024", DateOrder::MonthFirst), ymd(2024, 3, 4));
        assert_eq!(parse_date("03/04/2024", DateOrder::DayFirst), ymd(2024, 4, 3));
        assert_eq!(parse_date("15.01.2024", DateOrder::MonthFirst), ymd(2024, 1, 15));
        assert_eq!(parse_date("01/15/2024", DateOrder::DayFirst), ymd(2024, 1, 15));
    }

    #[test]
    fn test_parse_two_digit_year() {
        assert_eq!(parse_date("12/15/24", DateOrder::MonthFirst), ymd(2024, 12, 15));
        assert_eq!(parse_date("12/15/99", DateOrder::MonthFirst), ymd(1999, 12, 15));
    }

    #[test]
    fn test_parse_month_names() {
        assert_eq!(parse_date("January 14, 2025", DateOrder::MonthFirst), ymd(2025, 1, 14));
        assert_eq!(parse_date("Sept. 3rd 2024", DateOrder::MonthFirst), ymd(2024, 9, 3));
        assert_eq!(parse_date("3 March 2024", DateOrder::MonthFirst), ymd(2024, 3, 3));
        assert_eq!(parse_date("14th Feb, 2024", DateOrder::MonthFirst), ymd(2024, 2, 14));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date("13/13/2024", DateOrder::MonthFirst), None);
        assert_eq!(parse_date("02/30/2024", DateOrder::MonthFirst), None);
        assert_eq!(parse_date("Smarch 3, 2024", DateOrder::MonthFirst), None);
        assert_eq!(parse_date("not a date", DateOrder::MonthFirst), None);
    }
}
