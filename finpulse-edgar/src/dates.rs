//! Date helpers for filing periods.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{EdgarError, Result};

/// Parse an EDGAR `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| EdgarError::Parse(format!("invalid date '{raw}': {e}")))
}

/// First day of the window reaching back `months` from `as_of`.
pub fn months_before(as_of: NaiveDate, months: u32) -> NaiveDate {
    as_of.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
}

/// Calendar quarter label for a period end, e.g. `"Q3 2024"`.
pub fn filing_period_description(period_end: &str) -> Result<String> {
    let date = parse_date(period_end)?;
    Ok(format!("Q{} {}", date.month0() / 3 + 1, date.year()))
}

/// The latest of `dates` no older than `max_age_days` before `as_of`.
///
/// Unparsable entries are ignored.
pub fn most_recent_period<'a>(
    dates: impl IntoIterator<Item = &'a str>,
    as_of: NaiveDate,
    max_age_days: i64,
) -> Option<NaiveDate> {
    dates
        .into_iter()
        .filter_map(|d| parse_date(d).ok())
        .filter(|d| (as_of - *d).num_days() <= max_age_days)
        .max()
}

/// Parse `"YYYY-MM-DD to YYYY-MM-DD"` into an inclusive range.
pub fn parse_date_range(raw: &str) -> Result<(NaiveDate, NaiveDate)> {
    let (start, end) = raw
        .split_once(" to ")
        .ok_or_else(|| EdgarError::Parse(format!("date range '{raw}' must look like 'A to B'")))?;
    let (start, end) = (parse_date(start)?, parse_date(end)?);
    if start > end {
        return Err(EdgarError::Parse(format!("date range '{raw}' ends before it starts")));
    }
    Ok((start, end))
}

/// Calendar quarter ends of `year`, in order.
pub fn expected_filing_periods(year: i32) -> Vec<NaiveDate> {
    [(3, 31), (6, 30), (9, 30), (12, 31)]
        .into_iter()
        .filter_map(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn describes_calendar_quarter() {
        assert_eq!(filing_period_description("2024-09-28").unwrap(), "Q3 2024");
        assert_eq!(filing_period_description("2024-12-31").unwrap(), "Q4 2024");
        assert_eq!(filing_period_description("2025-01-01").unwrap(), "Q1 2025");
        assert!(filing_period_description("Sept 2024").is_err());
    }

    #[test]
    fn most_recent_period_honours_age_limit() {
        let dates = ["2024-06-29", "2023-09-30", "garbage", "2024-03-30"];
        assert_eq!(most_recent_period(dates, date("2024-11-01"), 365), Some(date("2024-06-29")));
        assert_eq!(most_recent_period(dates, date("2026-01-01"), 365), None);
    }

    #[test]
    fn parses_date_ranges() {
        let (start, end) = parse_date_range("2024-01-01 to 2024-12-31").unwrap();
        assert_eq!(start, date("2024-01-01"));
        assert_eq!(end, date("2024-12-31"));
        assert!(parse_date_range("2024-01-01").is_err());
        assert!(parse_date_range("2024-12-31 to 2024-01-01").is_err());
    }

    #[test]
    fn window_start_clamps_month_ends() {
        assert_eq!(months_before(date("2024-11-01"), 24), date("2022-11-01"));
        assert_eq!(months_before(date("2024-02-29"), 12), date("2023-02-28"));
    }

    #[test]
    fn lists_quarter_ends() {
        let periods = expected_filing_periods(2024);
        assert_eq!(periods.len(), 4);
        assert_eq!(periods[2], date("2024-09-30"));
    }
}
