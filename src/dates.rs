use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;

use crate::error::SourceError;
use crate::models::Month;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// The date shapes that appear across state sources.
///
/// An explicit list rather than a free-form pattern so each state's config
/// names exactly one shape and each shape is testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DateFormat {
    /// `M/D/YYYY` (New York sanction files).
    #[serde(rename = "m/d/yyyy")]
    MonthDayYear,
    /// `YYYY-MM-DD`, optionally with a trailing time component (Minnesota).
    #[serde(rename = "yyyy-mm-dd")]
    YearMonthDay,
    /// `YYYY-MM`, already on the canonical axis.
    #[serde(rename = "yyyy-mm")]
    YearMonth,
    /// `M/YYYY` (Illinois monthly matrices).
    #[serde(rename = "m/yyyy")]
    MonthYear,
    /// `<month name> YYYY`, full name or 3-letter prefix (Texas).
    #[serde(rename = "month-name")]
    MonthName,
    /// `YYMMDD` or `YYYYMMDD` (Vermont mainframe exports).
    #[serde(rename = "yymmdd")]
    Compact,
}

impl DateFormat {
    fn expected(&self) -> &'static str {
        match self {
            DateFormat::MonthDayYear => "M/D/YYYY",
            DateFormat::YearMonthDay => "YYYY-MM-DD",
            DateFormat::YearMonth => "YYYY-MM",
            DateFormat::MonthYear => "M/YYYY",
            DateFormat::MonthName => "<month name> YYYY",
            DateFormat::Compact => "YYMMDD",
        }
    }

    /// Resolve a raw date string to its calendar month.
    pub fn parse_month(&self, raw: &str) -> Result<Month, SourceError> {
        let fail = || SourceError::DateParse {
            value: raw.to_string(),
            expected: self.expected(),
        };
        let s = raw.trim();
        if s.is_empty() {
            return Err(fail());
        }

        let month = match self {
            DateFormat::MonthDayYear => NaiveDate::parse_from_str(s, "%m/%d/%Y")
                .ok()
                .and_then(|d| Month::new(d.year(), d.month())),
            DateFormat::YearMonthDay => {
                // Strip any time component first.
                let date_part = s.split_whitespace().next().unwrap_or(s);
                let date_part = date_part.split('T').next().unwrap_or(date_part);
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| Month::new(d.year(), d.month()))
            }
            DateFormat::YearMonth => s.parse::<Month>().ok(),
            DateFormat::MonthYear => Month::parse_month_year(s),
            DateFormat::MonthName => {
                let mut words = s.split_whitespace();
                let name = words.next().ok_or_else(fail)?;
                let year: i32 = words
                    .next()
                    .and_then(|y| y.parse().ok())
                    .ok_or_else(fail)?;
                month_from_name(name).and_then(|m| Month::new(year, m))
            }
            DateFormat::Compact => {
                if !s.chars().all(|c| c.is_ascii_digit()) {
                    return Err(fail());
                }
                match s.len() {
                    6 => {
                        let yy: i32 = s[0..2].parse().map_err(|_| fail())?;
                        let m: u32 = s[2..4].parse().map_err(|_| fail())?;
                        // Two-digit century pivot: 51-99 → 1900s, 00-50 → 2000s.
                        let year = if yy > 50 { 1900 + yy } else { 2000 + yy };
                        Month::new(year, m)
                    }
                    8 => {
                        let y: i32 = s[0..4].parse().map_err(|_| fail())?;
                        let m: u32 = s[4..6].parse().map_err(|_| fail())?;
                        Month::new(y, m)
                    }
                    _ => return Err(fail()),
                }
            }
        };

        month.ok_or_else(fail)
    }
}

/// Month number from a name, accepting the full name or a 3-letter prefix.
pub fn month_from_name(name: &str) -> Option<u32> {
    let s = name.trim().to_lowercase();
    if s.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|m| *m == s || s.starts_with(&m[..3]))
        .map(|i| i as u32 + 1)
}

/// Month number from a workbook tab name: a month name, or a bare 1-12
/// numeral embedded in the text. Returns `None` for non-month tabs.
pub fn month_from_sheet_name(name: &str) -> Option<u32> {
    if let Some(m) = month_from_name(name) {
        return Some(m);
    }
    let re = Regex::new(r"(?:^|[^0-9])([1-9]|1[0-2])(?:[^0-9]|$)").unwrap();
    re.captures(name.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// A 4-digit year token from a file name, e.g. `suspensions_2021.xlsx`.
pub fn year_from_filename(stem: &str) -> Option<i32> {
    stem.split(|c: char| c == ' ' || c == '_' || c == '-' || c == '.')
        .find(|tok| tok.len() == 4 && tok.chars().all(|c| c.is_ascii_digit()))
        .and_then(|tok| tok.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_day_year() {
        let m = DateFormat::MonthDayYear.parse_month("6/15/2021").unwrap();
        assert_eq!(m.to_string(), "2021-06");
        assert!(DateFormat::MonthDayYear.parse_month("13/1/2020").is_err());
        assert!(DateFormat::MonthDayYear.parse_month("6/2021").is_err());
    }

    #[test]
    fn test_year_month_day_with_time() {
        let m = DateFormat::YearMonthDay
            .parse_month("2019-03-07 00:00:00")
            .unwrap();
        assert_eq!(m.to_string(), "2019-03");
    }

    #[test]
    fn test_month_year_invalid_month_is_date_error() {
        let err = DateFormat::MonthYear.parse_month("13/2020").unwrap_err();
        assert!(err.to_string().contains("13/2020"));
    }

    #[test]
    fn test_month_name_formats() {
        let m = DateFormat::MonthName.parse_month("January 2020").unwrap();
        assert_eq!(m.to_string(), "2020-01");
        let m = DateFormat::MonthName.parse_month("sep 2018").unwrap();
        assert_eq!(m.to_string(), "2018-09");
        assert!(DateFormat::MonthName.parse_month("Smarch 2020").is_err());
    }

    #[test]
    fn test_compact_century_pivot() {
        let m = DateFormat::Compact.parse_month("990312").unwrap();
        assert_eq!(m.to_string(), "1999-03");
        let m = DateFormat::Compact.parse_month("120501").unwrap();
        assert_eq!(m.to_string(), "2012-05");
        let m = DateFormat::Compact.parse_month("20210607").unwrap();
        assert_eq!(m.to_string(), "2021-06");
        assert!(DateFormat::Compact.parse_month("000000").is_err());
    }

    #[test]
    fn test_sheet_name_months() {
        assert_eq!(month_from_sheet_name("January"), Some(1));
        assert_eq!(month_from_sheet_name("Feb 2021"), Some(2));
        assert_eq!(month_from_sheet_name("Month 11"), Some(11));
        assert_eq!(month_from_sheet_name("Summary"), None);
    }

    #[test]
    fn test_year_from_filename() {
        assert_eq!(year_from_filename("colorado_2021_actions"), Some(2021));
        assert_eq!(year_from_filename("DLS 2019.xlsx"), Some(2019));
        assert_eq!(year_from_filename("notes"), None);
    }
}
