//! Margin financing balances.
//!
//! Two exchange feeds are combined into one snapshot through a two-step
//! chain: a joined daily history over a trailing window, then a single-point
//! lookup of the latest trade date. Each feed reports balances in its own
//! (and occasionally changing) unit, so every combined figure passes through
//! [`reconcile_margin_units`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Weekday};
use polars::prelude::*;
use serde_json::Value;

use super::circuit_breaker::CircuitBreaker;
use super::fallback::FallbackChain;
use super::http::HttpFetcher;
use super::provider::{coerce_number, DataError, MarginFeed, MarginRecord};
use crate::domain::{MarginPoint, MarginProvenance, MarginSnapshot};
use crate::time::{self, TimeToken};

pub const DEFAULT_SSE_URL: &str = "http://query.sse.com.cn/marketdata/tradedata/queryMargin.do";
pub const DEFAULT_SZSE_URL: &str = "https://www.szse.cn/api/report/ShowReport/data";
/// Calendar days the Shenzhen feed walks back from the end of a history request.
pub const DEFAULT_SZSE_HISTORY_DAYS: u32 = 30;

const UNIT_FACTOR: f64 = 10_000.0;
const SMALL_BALANCE: f64 = 1e9;
const LARGE_BALANCE: f64 = 1e11;
const MAX_RATIO: f64 = 3.0;
const MIN_RATIO: f64 = 0.01;

/// Days searched backwards for the latest record in single-point mode.
const SINGLE_POINT_WINDOW_DAYS: i64 = 14;

/// Multipliers to apply to each exchange's balances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginScale {
    pub exchange_a: f64,
    pub exchange_b: f64,
}

impl MarginScale {
    pub const IDENTITY: MarginScale = MarginScale {
        exchange_a: 1.0,
        exchange_b: 1.0,
    };

    pub fn apply(&self, date: NaiveDate, a: f64, b: f64) -> MarginPoint {
        MarginPoint::new(date, a * self.exchange_a, b * self.exchange_b)
    }
}

/// Derive unit corrections from the latest pair of balances.
///
/// 1. Magnitude: if one balance is below 1e9 while the other exceeds 1e11,
///    the smaller one is scaled up by 10,000.
/// 2. Ratio (after step 1): B/A above 3 scales B down by 10,000; below 0.01
///    scales B up by 10,000.
pub fn reconcile_margin_units(latest_a: f64, latest_b: f64) -> MarginScale {
    let mut scale = MarginScale::IDENTITY;

    if latest_a < SMALL_BALANCE && latest_b > LARGE_BALANCE {
        scale.exchange_a *= UNIT_FACTOR;
    } else if latest_b < SMALL_BALANCE && latest_a > LARGE_BALANCE {
        scale.exchange_b *= UNIT_FACTOR;
    }

    let a = latest_a * scale.exchange_a;
    let b = latest_b * scale.exchange_b;
    if a > 0.0 {
        let ratio = b / a;
        if ratio > MAX_RATIO {
            scale.exchange_b /= UNIT_FACTOR;
        } else if ratio < MIN_RATIO {
            scale.exchange_b *= UNIT_FACTOR;
        }
    }

    if scale != MarginScale::IDENTITY {
        tracing::debug!(?scale, latest_a, latest_b, "margin units reconciled");
    }
    scale
}

fn records_frame(records: &[MarginRecord], column: &str) -> PolarsResult<DataFrame> {
    let days: Vec<i32> = records.iter().map(|r| r.date.num_days_from_ce()).collect();
    let balances: Vec<f64> = records.iter().map(|r| r.balance).collect();
    df!("date" => days, column => balances)
}

/// Inner join of two exchange histories on trade date, ascending.
/// Dates present in only one feed are dropped; duplicates keep the first record.
pub fn join_on_date(
    a: &[MarginRecord],
    b: &[MarginRecord],
) -> Result<Vec<(NaiveDate, f64, f64)>, DataError> {
    let map_err = |e: PolarsError| DataError::Frame(format!("margin join: {e}"));

    let dedupe = |df: DataFrame| {
        df.lazy()
            .unique_stable(Some(vec!["date".into()]), UniqueKeepStrategy::First)
    };
    let left = dedupe(records_frame(a, "exchange_a").map_err(map_err)?);
    let right = dedupe(records_frame(b, "exchange_b").map_err(map_err)?);

    let joined = left
        .join(
            right,
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(["date"], SortMultipleOptions::default())
        .collect()
        .map_err(map_err)?;

    let dates = joined.column("date").map_err(map_err)?.i32().map_err(map_err)?;
    let a_vals = joined
        .column("exchange_a")
        .map_err(map_err)?
        .f64()
        .map_err(map_err)?;
    let b_vals = joined
        .column("exchange_b")
        .map_err(map_err)?
        .f64()
        .map_err(map_err)?;

    let rows = dates
        .into_iter()
        .zip(a_vals.into_iter())
        .zip(b_vals.into_iter())
        .filter_map(|((d, a), b)| {
            let date = NaiveDate::from_num_days_from_ce_opt(d?)?;
            Some((date, a?, b?))
        })
        .collect();
    Ok(rows)
}

fn joined_history(
    a: &dyn MarginFeed,
    b: &dyn MarginFeed,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MarginPoint>, DataError> {
    let history_a = a.fetch_history(start, end)?;
    let history_b = b.fetch_history(start, end)?;
    let rows = join_on_date(&history_a, &history_b)?;

    let &(_, latest_a, latest_b) = rows.last().ok_or_else(|| DataError::Empty {
        provider: format!("{}+{}", a.exchange(), b.exchange()),
        what: format!("margin dates in common {start}..{end}"),
    })?;

    let scale = reconcile_margin_units(latest_a, latest_b);
    Ok(rows
        .into_iter()
        .map(|(date, va, vb)| scale.apply(date, va, vb))
        .collect())
}

fn single_point(
    a: &dyn MarginFeed,
    b: &dyn MarginFeed,
    end: NaiveDate,
) -> Result<MarginPoint, DataError> {
    let start = end - chrono::Duration::days(SINGLE_POINT_WINDOW_DAYS);
    let latest_a = a
        .fetch_history(start, end)?
        .into_iter()
        .max_by_key(|r| r.date)
        .ok_or_else(|| DataError::Empty {
            provider: a.exchange().to_string(),
            what: format!("margin records {start}..{end}"),
        })?;
    let record_b = b.fetch_day(latest_a.date)?;

    let scale = reconcile_margin_units(latest_a.balance, record_b.balance);
    Ok(scale.apply(latest_a.date, latest_a.balance, record_b.balance))
}

/// Build the margin snapshot. Never fails: an exhausted chain yields an
/// unavailable snapshot carrying the reason.
pub fn fetch_margin_snapshot(
    exchange_a: &dyn MarginFeed,
    exchange_b: &dyn MarginFeed,
    today: NaiveDate,
    window_days: u32,
) -> MarginSnapshot {
    let start = today - chrono::Duration::days(i64::from(window_days));

    let outcome = FallbackChain::new("margin")
        .then("joined_history", || {
            let history = joined_history(exchange_a, exchange_b, start, today)?;
            let latest = *history.last().ok_or_else(|| DataError::Other("empty join".into()))?;
            Ok((latest, Some(history), MarginProvenance::JoinedHistory))
        })
        .then("single_point", || {
            let point = single_point(exchange_a, exchange_b, today)?;
            Ok((point, None, MarginProvenance::SinglePoint))
        })
        .run();

    match outcome {
        Ok(outcome) => {
            let (latest, history, provenance) = outcome.value;
            MarginSnapshot::from_latest(latest, history, provenance)
        }
        Err(e) => {
            tracing::warn!(error = %e, "margin data unavailable");
            MarginSnapshot::unavailable(e.to_string())
        }
    }
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => time::parse_date(s),
        Value::Number(n) => time::normalize(TimeToken::Number(n.as_i64()?)).map(|m| m.date()),
        _ => None,
    }
}

/// Shanghai exchange margin summary (range query, balances in currency units).
pub struct SseMarginFeed {
    http: HttpFetcher,
    url: String,
}

impl SseMarginFeed {
    pub fn new(timeout: Duration, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new("sse", timeout, circuit_breaker)?,
            url: DEFAULT_SSE_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// `{"result": [{"opDate": "20241220", "rzye": 812345678901, ...}, ...]}`
pub fn parse_sse_payload(payload: &Value) -> Result<Vec<MarginRecord>, DataError> {
    let rows = payload
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged("sse: missing result array".into()))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(MarginRecord {
                date: date_of(row.get("opDate")?)?,
                balance: coerce_number(row.get("rzye")?)?,
            })
        })
        .collect())
}

impl MarginFeed for SseMarginFeed {
    fn exchange(&self) -> &str {
        "sse"
    }

    fn fetch_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarginRecord>, DataError> {
        let fmt = |d: NaiveDate| d.format("%Y%m%d").to_string();
        let query = [
            ("isPagination", "true".to_string()),
            ("beginDate", fmt(start)),
            ("endDate", fmt(end)),
            ("tabType", String::new()),
            ("stockCode", String::new()),
            ("pageHelp.pageSize", "5000".to_string()),
            ("pageHelp.pageNo", "1".to_string()),
            ("pageHelp.beginPage", "1".to_string()),
            ("pageHelp.cacheSize", "1".to_string()),
            ("pageHelp.endPage", "5".to_string()),
        ];
        let payload = self
            .http
            .get_json(&self.url, &query, Some("http://www.sse.com.cn/"))?;
        let records = parse_sse_payload(&payload)?;
        if records.is_empty() {
            return Err(DataError::Empty {
                provider: "sse".into(),
                what: format!("margin {start}..{end}"),
            });
        }
        Ok(records)
    }

    fn fetch_day(&self, date: NaiveDate) -> Result<MarginRecord, DataError> {
        self.fetch_history(date, date)?
            .into_iter()
            .find(|r| r.date == date)
            .ok_or_else(|| DataError::Empty {
                provider: "sse".into(),
                what: format!("margin {date}"),
            })
    }
}

/// Shenzhen exchange margin summary (balances in the exchange's display unit).
///
/// The exchange only reports one trade date per request, so a history is one
/// GET per weekday. The walk is capped at `history_days` back from the end of
/// the requested range.
pub struct SzseMarginFeed {
    http: HttpFetcher,
    url: String,
    history_days: u32,
}

impl SzseMarginFeed {
    pub fn new(timeout: Duration, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new("szse", timeout, circuit_breaker)?,
            url: DEFAULT_SZSE_URL.to_string(),
            history_days: DEFAULT_SZSE_HISTORY_DAYS,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }
}

/// Weekdays in `start..=end`, limited to the last `max_days` calendar days.
fn capped_weekdays(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<NaiveDate> {
    let floor = end - chrono::Duration::days(i64::from(max_days));
    start
        .max(floor)
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// `[{"data": [{"jrrzye": "9,012.34", ...}], "metadata": {...}}, ...]`
pub fn parse_szse_payload(date: NaiveDate, payload: &Value) -> Result<MarginRecord, DataError> {
    let rows = payload
        .as_array()
        .and_then(|tabs| tabs.first())
        .and_then(|tab| tab.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged("szse: missing data table".into()))?;

    let row = rows.first().ok_or_else(|| DataError::Empty {
        provider: "szse".into(),
        what: format!("margin {date}"),
    })?;

    let balance = row
        .get("jrrzye")
        .and_then(coerce_number)
        .ok_or_else(|| DataError::ResponseFormatChanged("szse: missing jrrzye".into()))?;

    Ok(MarginRecord { date, balance })
}

impl MarginFeed for SzseMarginFeed {
    fn exchange(&self) -> &str {
        "szse"
    }

    /// One request per weekday over the capped range; days without a report
    /// (holidays) are skipped.
    fn fetch_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarginRecord>, DataError> {
        let days = capped_weekdays(start, end, self.history_days);
        tracing::debug!(requests = days.len(), %start, %end, "walking szse margin days");
        let mut records = Vec::new();
        for date in days {
            match self.fetch_day(date) {
                Ok(record) => records.push(record),
                Err(DataError::Empty { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        if records.is_empty() {
            return Err(DataError::Empty {
                provider: "szse".into(),
                what: format!("margin {start}..{end}"),
            });
        }
        Ok(records)
    }

    fn fetch_day(&self, date: NaiveDate) -> Result<MarginRecord, DataError> {
        let query = [
            ("SHOWTYPE", "JSON".to_string()),
            ("CATALOGID", "1837_xxpl".to_string()),
            ("txtDate", date.format("%Y-%m-%d").to_string()),
            ("tab1PAGENO", "1".to_string()),
        ];
        let payload = self.http.get_json(&self.url, &query, None)?;
        parse_szse_payload(date, &payload)
    }
}
