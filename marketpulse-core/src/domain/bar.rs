//! PriceBar and IndexSeries, the basic market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV candle for one index on one trading day.
///
/// Open/high/low tokens a provider could not deliver are carried as NaN
/// ("void" fields). Close is always a finite number. An undelivered volume
/// is `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded volume in lots.
    pub volume: Option<u64>,
    /// Traded value in currency units, when the provider reports it.
    pub amount: Option<f64>,
    /// Percent change against the previous close (2.5 means +2.5%).
    pub pct_change: Option<f64>,
}

impl PriceBar {
    /// Returns true if any of open/high/low/close is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Chronologically ordered bars for one index.
///
/// Built only through [`IndexSeries::new`], which sorts by date, keeps the
/// first bar of any duplicated date, drops bars without a finite close and
/// derives missing percent changes from consecutive closes. Dates are
/// therefore strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSeries {
    code: String,
    name: String,
    bars: Vec<PriceBar>,
}

impl IndexSeries {
    pub fn new(code: impl Into<String>, name: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.retain(|b| b.close.is_finite());
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        for i in 1..bars.len() {
            if bars[i].pct_change.is_none() {
                let prev = bars[i - 1].close;
                if prev > 0.0 {
                    bars[i].pct_change = Some((bars[i].close / prev - 1.0) * 100.0);
                }
            }
        }

        Self {
            code: code.into(),
            name: name.into(),
            bars,
        }
    }

    /// Replace the display name (providers rarely agree on it).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Volumes with unknown values as NaN.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.volume.map_or(f64::NAN, |v| v as f64))
            .collect()
    }

    /// Percent changes with unknown values as NaN (the first bar is always unknown
    /// unless the provider reported it).
    pub fn pct_changes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.pct_change.unwrap_or(f64::NAN))
            .collect()
    }
}
