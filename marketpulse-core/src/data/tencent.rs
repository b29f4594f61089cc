//! Tencent quote adapters.
//!
//! History comes from the fqkline JSON endpoint:
//! `{"data": {"<code>": {"day": [[date, open, close, high, low, volume, ...], ...]}}}`
//! (stocks use `qfqday`). Rows may carry extra columns; rows with fewer than
//! six are skipped.
//!
//! Realtime quotes come from the `qt` endpoint as a text blob of
//! `v_<code>="f0~f1~...";` entries with fields at fixed offsets.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::circuit_breaker::CircuitBreaker;
use super::http::HttpFetcher;
use super::provider::{
    coerce_number, normalize_code, parse_number, DataError, HistorySource, RealtimeSource,
};
use crate::domain::{IndexSeries, PriceBar, RealtimeQuote};
use crate::time::{self, Moment, TimeToken};

pub const DEFAULT_KLINE_URL: &str = "http://web.ifzq.gtimg.cn/appstock/app/fqkline/get";
pub const DEFAULT_QUOTE_URL: &str = "http://qt.gtimg.cn/q=";

/// Field offsets inside a realtime entry.
mod field {
    pub const NAME: usize = 1;
    pub const PRICE: usize = 3;
    pub const OPEN: usize = 5;
    pub const VOLUME: usize = 6;
    pub const TIME: usize = 30;
    pub const PCT_CHANGE: usize = 32;
    pub const HIGH: usize = 33;
    pub const LOW: usize = 34;
    pub const AMOUNT: usize = 37;
}

/// Realtime amounts are reported in units of 10,000.
const AMOUNT_SCALE: f64 = 10_000.0;

/// Entries shorter than this are truncated or not index/stock quotes.
const MIN_QUOTE_FIELDS: usize = 33;

pub struct TencentClient {
    http: HttpFetcher,
    kline_url: String,
    quote_url: String,
}

impl TencentClient {
    pub fn new(timeout: Duration, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new("tencent", timeout, circuit_breaker)?,
            kline_url: DEFAULT_KLINE_URL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
        })
    }

    pub fn with_urls(mut self, kline_url: impl Into<String>, quote_url: impl Into<String>) -> Self {
        self.kline_url = kline_url.into();
        self.quote_url = quote_url.into();
        self
    }
}

impl HistorySource for TencentClient {
    fn name(&self) -> &str {
        "tencent"
    }

    fn fetch_history(&self, code: &str, lookback_days: usize) -> Result<IndexSeries, DataError> {
        let code = normalize_code(code);
        let param = format!("{code},day,,,{lookback_days},qfq");
        let payload = self
            .http
            .get_json(&self.kline_url, &[("param", param)], None)?;
        let bars = parse_kline_payload(&code, &payload)?;
        tracing::debug!(code = %code, bars = bars.len(), "tencent history");
        Ok(IndexSeries::new(code.clone(), code, bars))
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}

impl RealtimeSource for TencentClient {
    fn name(&self) -> &str {
        "tencent"
    }

    fn fetch_realtime(
        &self,
        codes: &[String],
    ) -> Result<BTreeMap<String, RealtimeQuote>, DataError> {
        if codes.is_empty() {
            return Ok(BTreeMap::new());
        }
        let joined = codes
            .iter()
            .map(|c| normalize_code(c))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}{joined}", self.quote_url);
        let body = self.http.get_text(&url, &[], None)?;
        let quotes = parse_quote_blob(&body, time::beijing_now());
        tracing::debug!(requested = codes.len(), received = quotes.len(), "tencent realtime");
        Ok(quotes)
    }
}

/// Extract bars for `code` from a fqkline payload.
pub fn parse_kline_payload(code: &str, payload: &Value) -> Result<Vec<PriceBar>, DataError> {
    let entry = payload
        .get("data")
        .and_then(|d| d.get(code))
        .ok_or_else(|| DataError::CodeNotFound {
            code: code.to_string(),
        })?;

    let rows = entry
        .get("day")
        .or_else(|| entry.get("qfqday"))
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("no day rows for {code}")))?;

    let bars: Vec<PriceBar> = rows
        .iter()
        .filter_map(|row| parse_kline_row(row.as_array()?))
        .collect();

    if bars.is_empty() {
        return Err(DataError::Empty {
            provider: "tencent".into(),
            what: code.to_string(),
        });
    }
    Ok(bars)
}

/// `[date, open, close, high, low, volume, ...]`
fn parse_kline_row(row: &[Value]) -> Option<PriceBar> {
    if row.len() < 6 {
        return None;
    }
    let date = time::parse_date(row[0].as_str()?)?;
    let close = coerce_number(&row[2])?;

    Some(PriceBar {
        date,
        open: coerce_number(&row[1]).unwrap_or(f64::NAN),
        high: coerce_number(&row[3]).unwrap_or(f64::NAN),
        low: coerce_number(&row[4]).unwrap_or(f64::NAN),
        close,
        volume: coerce_number(&row[5]).and_then(to_lots),
        amount: None,
        pct_change: None,
    })
}

/// Negative or non-finite tokens are unknown, not zero.
fn to_lots(volume: f64) -> Option<u64> {
    (volume.is_finite() && volume >= 0.0).then(|| volume.round() as u64)
}

/// Parse a realtime blob into quotes keyed by normalized code.
///
/// `fallback_time` stamps entries whose own timestamp is missing or
/// unparseable.
pub fn parse_quote_blob(
    body: &str,
    fallback_time: chrono::DateTime<chrono::FixedOffset>,
) -> BTreeMap<String, RealtimeQuote> {
    body.split(';')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let code = normalize_code(key.trim().trim_start_matches("v_"));
            let fields: Vec<&str> = value.trim().trim_matches('"').split('~').collect();
            let quote = parse_quote_fields(&code, &fields, fallback_time)?;
            Some((code, quote))
        })
        .collect()
}

fn parse_quote_fields(
    code: &str,
    fields: &[&str],
    fallback_time: chrono::DateTime<chrono::FixedOffset>,
) -> Option<RealtimeQuote> {
    if code.is_empty() || fields.len() < MIN_QUOTE_FIELDS {
        return None;
    }
    let number = |i: usize| fields.get(i).and_then(|s| parse_number(s));

    let last_price = number(field::PRICE)?;
    let observed_at = match time::normalize(TimeToken::Text(fields[field::TIME])) {
        Some(Moment::Instant(at)) => at,
        _ => fallback_time,
    };

    Some(RealtimeQuote {
        code: code.to_string(),
        name: fields[field::NAME].trim().to_string(),
        last_price,
        pct_change: number(field::PCT_CHANGE),
        volume: number(field::VOLUME).and_then(to_lots),
        amount: number(field::AMOUNT).map(|a| a * AMOUNT_SCALE),
        open: number(field::OPEN),
        high: number(field::HIGH),
        low: number(field::LOW),
        observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn blob_fields(price: &str, volume: &str) -> String {
        let mut fields = vec!["0"; 40];
        fields[0] = "1";
        fields[1] = "上证指数";
        fields[2] = "000001";
        fields[3] = price;
        fields[5] = "3250.10";
        fields[6] = volume;
        fields[30] = "20241220150000";
        fields[32] = "0.56";
        fields[33] = "3280.00";
        fields[34] = "3240.50";
        fields[37] = "45678.9";
        fields.join("~")
    }

    fn fallback() -> chrono::DateTime<chrono::FixedOffset> {
        time::beijing()
            .with_ymd_and_hms(2024, 12, 20, 9, 0, 0)
            .unwrap()
    }

    #[test]
    fn kline_rows_map_tencent_column_order() {
        let payload = json!({
            "code": 0,
            "data": {"sh000001": {"day": [
                ["2024-12-19", "3300.0", "3310.5", "3320.0", "3290.0", "250000000.000"],
                ["2024-12-20", "3310.5", "3320.0", "3330.0", "3305.0", "260000000", {"extra": 1}, "x"],
            ]}}
        });
        let bars = parse_kline_payload("sh000001", &payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 12, 19).unwrap());
        assert_eq!(bars[0].open, 3300.0);
        assert_eq!(bars[0].close, 3310.5);
        assert_eq!(bars[0].high, 3320.0);
        assert_eq!(bars[0].low, 3290.0);
        assert_eq!(bars[1].volume, Some(260_000_000));
    }

    #[test]
    fn short_and_unparseable_rows_are_skipped() {
        let payload = json!({"data": {"sz399006": {"qfqday": [
            ["2024-12-19", "1", "2", "3", "4"],
            ["not a date", "1", "2", "3", "4", "5"],
            ["2024-12-20", "-", "2100.5", "-", "-", 12345],
        ]}}});
        let bars = parse_kline_payload("sz399006", &payload).unwrap();
        assert_eq!(bars.len(), 1);
        assert!(bars[0].open.is_nan());
        assert!(bars[0].is_void());
        assert_eq!(bars[0].close, 2100.5);
        assert_eq!(bars[0].volume, Some(12345));
    }

    #[test]
    fn dash_volume_is_unknown_not_zero() {
        let payload = json!({"data": {"sh000001": {"day": [
            ["2024-12-19", "3300.0", "3310.5", "3320.0", "3290.0", "0"],
            ["2024-12-20", "3310.5", "3320.0", "3330.0", "3305.0", "-"],
        ]}}});
        let bars = parse_kline_payload("sh000001", &payload).unwrap();
        assert_eq!(bars[0].volume, Some(0));
        assert_eq!(bars[1].volume, None);
    }

    #[test]
    fn dash_quote_volume_is_unknown_and_invalid() {
        let body = format!("v_sh000001=\"{}\";", blob_fields("3268.00", "-"));
        let q = &parse_quote_blob(&body, fallback())["sh000001"];
        assert_eq!(q.volume, None);
        assert!(!q.is_valid());
    }

    #[test]
    fn missing_code_is_not_found() {
        let payload = json!({"data": {}});
        assert!(matches!(
            parse_kline_payload("sh000001", &payload),
            Err(DataError::CodeNotFound { .. })
        ));
    }

    #[test]
    fn realtime_blob_offsets() {
        let body = format!(
            "v_sh000001=\"{}\";\nv_sz399001=\"1~short\";\n",
            blob_fields("3268.00", "312345678")
        );
        let quotes = parse_quote_blob(&body, fallback());
        assert_eq!(quotes.len(), 1);

        let q = &quotes["sh000001"];
        assert_eq!(q.name, "上证指数");
        assert_eq!(q.last_price, 3268.0);
        assert_eq!(q.open, Some(3250.10));
        assert_eq!(q.volume, Some(312_345_678));
        assert_eq!(q.pct_change, Some(0.56));
        assert_eq!(q.high, Some(3280.0));
        assert_eq!(q.low, Some(3240.5));
        assert!((q.amount.unwrap() - 456_789_000.0).abs() < 1e-3);
        assert_eq!(
            q.observed_at,
            time::beijing().with_ymd_and_hms(2024, 12, 20, 15, 0, 0).unwrap()
        );
        assert!(q.is_valid());
    }

    #[test]
    fn closed_market_quote_parses_but_is_invalid() {
        let body = format!("v_sz399006=\"{}\";", blob_fields("2100.00", "0"));
        let quotes = parse_quote_blob(&body, fallback());
        assert!(!quotes["sz399006"].is_valid());
    }

    #[test]
    fn unparseable_price_is_skipped() {
        let body = format!("v_sh000001=\"{}\";", blob_fields("--", "100"));
        assert!(parse_quote_blob(&body, fallback()).is_empty());
    }

    #[test]
    fn bad_timestamp_uses_fallback_time() {
        let fields = blob_fields("3268.00", "1").replace("20241220150000", "garbage");
        let quotes = parse_quote_blob(&format!("v_sh000001=\"{fields}\";"), fallback());
        assert_eq!(quotes["sh000001"].observed_at, fallback());
    }
}
