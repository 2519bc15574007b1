use std::{fmt, str::FromStr};

use anyhow::{Context, Error};
use time::Month;

use crate::Result;

/// A calendar month of a given year, e.g. `September 2024`.
///
/// Ordering is chronological: by year, then by month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthYear {
    pub year: i32,
    pub month: Month,
}

impl MonthYear {
    pub fn new(month: Month, year: i32) -> Self {
        Self { year, month }
    }

    /// Parses `"<Month name> <YYYY>"`. Month names are matched case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(name), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::msg(format!("expected \"<Month> <Year>\", got {s:?}")));
        };
        let month = month_from_name(name).with_context(|| format!("unknown month {name:?}"))?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::msg(format!("invalid year {year:?}")));
        }
        Ok(Self::new(month, year.parse()?))
    }

    /// Name without the separating space, usable in file names.
    pub fn compact(&self) -> String {
        format!("{}{}", self.month, self.year)
    }
}

impl PartialOrd for MonthYear {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonthYear {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, self.month as u8).cmp(&(other.year, other.month as u8))
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}

impl FromStr for MonthYear {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn month_from_name(name: &str) -> Option<Month> {
    let mut month = Month::January;
    for _ in 0..12 {
        if month.to_string().eq_ignore_ascii_case(name) {
            return Some(month);
        }
        month = month.next();
    }
    None
}

/// Sorts month strings chronologically, dropping the ones that do not parse.
pub fn sort_month_strings<S: AsRef<str>>(months: &[S]) -> Vec<MonthYear> {
    let mut parsed: Vec<MonthYear> = months
        .iter()
        .filter_map(|m| MonthYear::parse(m.as_ref()).ok())
        .collect();
    parsed.sort();
    parsed
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("September 2024", Month::September, 2024)]
    #[case("january 2021", Month::January, 2021)]
    #[case("  DECEMBER   1999 ", Month::December, 1999)]
    fn parses_month_names(#[case] input: &str, #[case] month: Month, #[case] year: i32) {
        assert_eq!(MonthYear::parse(input).unwrap(), MonthYear::new(month, year));
    }

    #[rstest]
    #[case("Sept 2024")]
    #[case("September")]
    #[case("September 24")]
    #[case("September 2024 extra")]
    #[case("2024 September")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(MonthYear::parse(input).is_err());
    }

    #[test]
    fn orders_across_years() {
        let sorted = sort_month_strings(&[
            "January 2025",
            "November 2024",
            "garbage",
            "February 2024",
            "December 2024",
        ]);
        let shown: Vec<String> = sorted.iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            ["February 2024", "November 2024", "December 2024", "January 2025"]
        );
    }

    #[test]
    fn compact_form() {
        assert_eq!(
            MonthYear::new(Month::March, 2023).compact(),
            "March2023"
        );
    }
}
