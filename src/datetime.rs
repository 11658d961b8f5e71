//! `MM/DD/YY` and `MM/DD/YY HH:MM` text dates.
//!
//! Parsing never fails loudly: text that does not match (or names an
//! impossible calendar date) yields `None`, and the date handlers load that
//! as `null`.
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{1,2})$").expect("date pattern"));
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{1,2}) (\d{1,2}):(\d{1,2})$").expect("datetime pattern")
});

fn numbers<const N: usize>(re: &Regex, text: &str) -> Option<[u32; N]> {
    let caps = re.captures(text)?;
    let mut out = [0u32; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = caps.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(out)
}

/// Two-digit years are taken to be in the 2000s.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let [month, day, year] = numbers::<3>(&DATE_RE, text)?;
    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let [month, day, year, hour, minute] = numbers::<5>(&DATETIME_RE, text)?;
    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)?.and_hms_opt(hour, minute, 0)
}

pub fn format_date(date: &NaiveDate, skip_current_year: bool) -> String {
    format_date_in(date, skip_current_year, Local::now().year())
}

pub fn format_datetime(datetime: &NaiveDateTime, skip_current_year: bool) -> String {
    format!(
        "{} {}",
        format_date(&datetime.date(), skip_current_year),
        datetime.format("%H:%M")
    )
}

fn format_date_in(date: &NaiveDate, skip_current_year: bool, current_year: i32) -> String {
    // month and day lose their leading zero, the year keeps it
    if skip_current_year && date.year() == current_year {
        format!("{}/{}", date.month(), date.day())
    } else {
        format!("{}/{}/{}", date.month(), date.day(), date.format("%y"))
    }
}
