//! Time normalization to Beijing time (UTC+8).
//!
//! Providers disagree on how they spell a date: compact `YYYYMMDD` numbers,
//! dotted `YYYY.MM` month labels, `YYYY年MM月份` labels, 14-digit wall-clock
//! stamps, ISO dates and RFC 3339 instants all show up. Every token is run
//! through an ordered list of parsers and the first one that succeeds wins.
//! A token no parser accepts is reported as `None`, never as an error, so
//! callers can drop that record from anything time-ordered.

use chrono::{Datelike, DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Offset of Beijing time from UTC, in seconds.
pub const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// The fixed UTC+8 offset. China has not observed DST since 1991.
pub fn beijing() -> FixedOffset {
    FixedOffset::east_opt(BEIJING_OFFSET_SECS).expect("UTC+8 is a valid offset")
}

/// Current instant in Beijing time.
pub fn beijing_now() -> DateTime<FixedOffset> {
    chrono::Utc::now().with_timezone(&beijing())
}

/// Current calendar date in Beijing.
pub fn beijing_today() -> NaiveDate {
    beijing_now().date_naive()
}

/// Interpret a naive wall-clock instant as Beijing local time.
pub fn localize_beijing(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(BEIJING_OFFSET_SECS));
    DateTime::from_naive_utc_and_offset(utc, beijing())
}

/// Convert an aware instant to Beijing time. The instant itself is unchanged.
pub fn to_beijing<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&beijing())
}

/// A raw timestamp as handed over by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeToken<'a> {
    Text(&'a str),
    /// Numeric date such as `20240102`.
    Number(i64),
    /// Wall-clock instant without zone; assumed Beijing local.
    Naive(NaiveDateTime),
    /// Zone-aware instant; converted, never reinterpreted.
    Aware(DateTime<FixedOffset>),
    Date(NaiveDate),
}

/// A normalized point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Moment {
    Instant(DateTime<FixedOffset>),
    Day(NaiveDate),
}

impl Moment {
    /// Calendar date in Beijing.
    pub fn date(&self) -> NaiveDate {
        match self {
            Moment::Instant(dt) => dt.date_naive(),
            Moment::Day(d) => *d,
        }
    }
}

type TextParser = fn(&str) -> Option<Moment>;

/// Text parsers in the order they are tried.
const TEXT_PARSERS: &[(&str, TextParser)] = &[
    ("compact_datetime", parse_compact_datetime),
    ("compact_date", parse_compact_date),
    ("iso_date", parse_iso_date),
    ("iso_datetime", parse_iso_datetime),
    ("dotted_month", parse_dotted_month),
    ("cjk_month", parse_cjk_month),
    ("rfc3339", parse_rfc3339),
];

/// Normalize any supported token. Returns `None` when every parser fails.
pub fn normalize(token: TimeToken<'_>) -> Option<Moment> {
    match token {
        TimeToken::Text(s) => normalize_text(s),
        TimeToken::Number(n) => normalize_text(&n.to_string()),
        TimeToken::Naive(naive) => Some(Moment::Instant(localize_beijing(naive))),
        TimeToken::Aware(dt) => Some(Moment::Instant(to_beijing(&dt))),
        TimeToken::Date(d) => Some(Moment::Day(d)),
    }
}

fn normalize_text(raw: &str) -> Option<Moment> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    TEXT_PARSERS.iter().find_map(|(_, parse)| parse(s))
}

/// Parse a date-granularity token (`20240102`, `2024-01-02`, `2024.01`, ...).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    normalize_text(raw).map(|m| m.date())
}

/// Parse a monthly label to the first day of that month.
pub fn parse_month_label(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).and_then(|d| d.with_day0(0))
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_compact_datetime(s: &str) -> Option<Moment> {
    if s.len() != 14 || !all_digits(s) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| Moment::Instant(localize_beijing(naive)))
}

fn parse_compact_date(s: &str) -> Option<Moment> {
    if s.len() != 8 || !all_digits(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(Moment::Day)
}

fn parse_iso_date(s: &str) -> Option<Moment> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
        .map(Moment::Day)
}

fn parse_iso_datetime(s: &str) -> Option<Moment> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| Moment::Instant(localize_beijing(naive)))
}

fn year_month(year: &str, month: &str) -> Option<Moment> {
    if year.len() != 4 || !all_digits(year) || month.is_empty() || month.len() > 2 {
        return None;
    }
    if !all_digits(month) {
        return None;
    }
    let y: i32 = year.parse().ok()?;
    let m: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, 1).map(Moment::Day)
}

/// `2024.12`, `2024.1`. A single-digit month is a month, not a decimal.
fn parse_dotted_month(s: &str) -> Option<Moment> {
    let (year, month) = s.split_once('.')?;
    year_month(year, month)
}

/// `2024年12月份`, `2024年1月`.
fn parse_cjk_month(s: &str) -> Option<Moment> {
    let (year, rest) = s.split_once('年')?;
    let rest = rest.strip_suffix('份').unwrap_or(rest);
    let month = rest.strip_suffix('月')?;
    year_month(year, month)
}

fn parse_rfc3339(s: &str) -> Option<Moment> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| Moment::Instant(to_beijing(&dt)))
}
