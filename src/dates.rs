//! Parsing of the loosely formatted dates found on listing and episode pages.

use std::sync::OnceLock;

use jiff::civil::Date;
use regex::{Captures, Regex};

/// How much of a [`PartialDate`] was actually present in the source text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Precision {
    Day,
    Month,
    Year,
}

/// A parsed date. Missing components are filled with the first day/month.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PartialDate {
    pub date: Date,
    pub precision: Precision,
}

impl PartialDate {
    pub fn year(&self) -> i16 {
        self.date.year()
    }
}

type Builder = fn(&Captures<'_>) -> Option<PartialDate>;

struct Pattern {
    regex: &'static str,
    build: Builder,
}

/// Tried in order; the first pattern that matches decides the result.
const PATTERNS: &[Pattern] = &[
    // 25 December 2020
    Pattern { regex: r"^(\d{1,2}) ([A-Za-z]{4,9}) (\d{4})$", build: day_month_year },
    // Dec 25, 2020
    Pattern { regex: r"^([A-Za-z]{3}) (\d{1,2}), (\d{4})$", build: month_day_year },
    // 25 Dec 2020
    Pattern { regex: r"^(\d{1,2}) ([A-Za-z]{3}) (\d{4})$", build: day_month_year },
    // December 2020
    Pattern { regex: r"^([A-Za-z]{4,9}) (\d{4})$", build: month_year },
    // Dec 2020
    Pattern { regex: r"^([A-Za-z]{3}) (\d{4})$", build: month_year },
    // 2020
    Pattern { regex: r"^(\d{4})$", build: year_only },
];

fn compiled() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|p| Regex::new(p.regex).expect("Invalid regex pattern defined in code"))
            .collect()
    })
}

/// Parses a date in any of the supported layouts. Unrecognised text, and text
/// that matches a layout but names an impossible date, yields `None`.
pub fn parse_date(text: &str) -> Option<PartialDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for (pattern, re) in PATTERNS.iter().zip(compiled()) {
        if let Some(caps) = re.captures(text) {
            return (pattern.build)(&caps);
        }
    }
    None
}

/// January 1 of the year `date` falls in.
pub fn rough_start(date: Date) -> Date {
    date.first_of_year()
}

/// December 31 of the year `date` falls in.
pub fn rough_end(date: Date) -> Date {
    date.last_of_year()
}

fn day_month_year(caps: &Captures<'_>) -> Option<PartialDate> {
    let day: i8 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i16 = caps[3].parse().ok()?;
    let date = Date::new(year, month, day).ok()?;
    Some(PartialDate { date, precision: Precision::Day })
}

fn month_day_year(caps: &Captures<'_>) -> Option<PartialDate> {
    let month = month_number(&caps[1])?;
    let day: i8 = caps[2].parse().ok()?;
    let year: i16 = caps[3].parse().ok()?;
    let date = Date::new(year, month, day).ok()?;
    Some(PartialDate { date, precision: Precision::Day })
}

fn month_year(caps: &Captures<'_>) -> Option<PartialDate> {
    let month = month_number(&caps[1])?;
    let year: i16 = caps[2].parse().ok()?;
    let date = Date::new(year, month, 1).ok()?;
    Some(PartialDate { date, precision: Precision::Month })
}

fn year_only(caps: &Captures<'_>) -> Option<PartialDate> {
    let year: i16 = caps[1].parse().ok()?;
    let date = Date::new(year, 1, 1).ok()?;
    Some(PartialDate { date, precision: Precision::Year })
}

const MONTHS: [&str; 12] = [
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

/// Accepts full English month names and their three-letter abbreviations.
fn month_number(name: &str) -> Option<i8> {
    let name = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name || (name.len() == 3 && m.starts_with(&name)))
        .map(|i| i as i8 + 1)
}
