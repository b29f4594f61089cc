//! Source traits and structured error types.
//!
//! Every upstream (Tencent quotes, exchange margin reports, the money supply
//! table, CSV imports, the synthetic generator) sits behind one of these
//! traits so the engine can swap implementations and tests can use fakes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{IndexSeries, RealtimeQuote};

/// Structured error types for data operations.
///
/// Adapters return these for a single call only; nothing here is fatal to a
/// whole analysis cycle.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("code not found: {code}")]
    CodeNotFound { code: String },

    #[error("provider '{provider}' returned no rows for {what}")]
    Empty { provider: String, what: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("all strategies failed for {chain}: {attempts}")]
    Exhausted { chain: String, attempts: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Daily candle history for one index.
pub trait HistorySource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch roughly the last `lookback_days` daily bars for `code`.
    fn fetch_history(&self, code: &str, lookback_days: usize) -> Result<IndexSeries, DataError>;

    /// Check if the source is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Batched intraday snapshot quotes.
pub trait RealtimeSource: Send + Sync {
    fn name(&self) -> &str;

    /// Quotes keyed by normalized code. Codes the provider did not answer
    /// for are absent from the map.
    fn fetch_realtime(&self, codes: &[String])
        -> Result<BTreeMap<String, RealtimeQuote>, DataError>;
}

/// Margin financing balance reported by one exchange for one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginRecord {
    pub date: NaiveDate,
    pub balance: f64,
}

/// Daily margin balances from a single exchange.
pub trait MarginFeed: Send + Sync {
    fn exchange(&self) -> &str;

    /// Records in `[start, end]`, in any order.
    fn fetch_history(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<MarginRecord>, DataError>;

    /// The record for exactly `date`.
    fn fetch_day(&self, date: NaiveDate) -> Result<MarginRecord, DataError>;
}

/// One row of the monthly money supply table as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneySupplyRow {
    /// Raw month label (`2024.12`, `2024年12月份`, ...).
    pub label: String,
    pub m1_yoy: f64,
    pub m2_yoy: f64,
}

/// Monthly M1/M2 year-over-year growth.
pub trait MoneySupplySource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_rows(&self) -> Result<Vec<MoneySupplyRow>, DataError>;
}

/// Normalize a provider code: `sh.000001` and `SH000001` become `sh000001`.
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Parse a numeric token that may arrive as a JSON number or a string
/// (with optional thousands separators). Non-numeric tokens are `None`.
pub fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(token: &str) -> Option<f64> {
    let cleaned: String = token.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
