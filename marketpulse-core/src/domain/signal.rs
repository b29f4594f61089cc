//! Derived per-index and cross-index signals.
//!
//! Every signal is a value object: built once per analysis cycle from an
//! [`IndexSeries`](super::IndexSeries) and never mutated afterwards.
//! Series fields are aligned with the bars they were computed from; a
//! `None` entry is a warmup position.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::bar::PriceBar;

/// Price versus its long EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Bull,
    Bear,
}

/// Volume versus its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingStatus {
    Expanding,
    Contracting,
}

/// Bias-based sentiment gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentStatus {
    Overheated,
    Neutral,
    Panic,
    ExtremePanic,
}

/// Volatility regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStatus {
    /// Volatility in the lowest band of its recent history; a breakout is near.
    Contracting,
    Expanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTrend {
    Strengthening,
    Weakening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleLeadership {
    Growth,
    Value,
}

impl TrendStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TrendStatus::Bull => "bull",
            TrendStatus::Bear => "bear",
        }
    }
}

impl FundingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FundingStatus::Expanding => "expanding",
            FundingStatus::Contracting => "contracting",
        }
    }
}

impl SentimentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SentimentStatus::Overheated => "overheated",
            SentimentStatus::Neutral => "neutral",
            SentimentStatus::Panic => "panic",
            SentimentStatus::ExtremePanic => "extreme panic",
        }
    }
}

impl TimingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TimingStatus::Contracting => "imminent regime change",
            TimingStatus::Expanding => "volatility expanding",
        }
    }
}

impl StyleTrend {
    pub fn label(&self) -> &'static str {
        match self {
            StyleTrend::Strengthening => "strengthening",
            StyleTrend::Weakening => "weakening",
        }
    }
}

impl StyleLeadership {
    pub fn label(&self) -> &'static str {
        match self {
            StyleLeadership::Growth => "growth leadership strengthening",
            StyleLeadership::Value => "value leadership strengthening",
        }
    }
}

macro_rules! display_via_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        })*
    };
}

display_via_label!(
    TrendStatus,
    FundingStatus,
    SentimentStatus,
    TimingStatus,
    StyleTrend,
    StyleLeadership
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignal {
    pub current_price: f64,
    pub ema: f64,
    pub span: usize,
    pub status: TrendStatus,
    pub description: String,
    pub ema_series: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingSignal {
    pub volume: f64,
    pub volume_ma: f64,
    pub window: usize,
    pub status: FundingStatus,
    pub description: String,
    pub volume_ma_series: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSignal {
    /// Bias in percent. Unbounded.
    pub score: f64,
    pub price_ma: f64,
    pub status: SentimentStatus,
    pub description: String,
    pub bias_series: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSignal {
    pub volatility: Option<f64>,
    /// Share of the lookback window strictly below the current volatility (0..=1).
    pub volatility_rank: f64,
    pub is_contracting: bool,
    pub status: TimingStatus,
    pub description: String,
    pub volatility_series: Vec<Option<f64>>,
}

/// Where the "current" price and volume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Realtime,
    History,
}

/// All four indicator families for one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSignal {
    pub key: String,
    pub code: String,
    pub name: String,
    pub as_of: NaiveDate,
    pub price_source: PriceSource,
    /// `None` when the latest volume or its average window is unknown.
    pub funding: Option<FundingSignal>,
    pub sentiment: SentimentSignal,
    pub trend: TrendSignal,
    pub timing: TimingSignal,
    /// Bars the signals were computed from (history merged with the realtime quote).
    pub bars: Vec<PriceBar>,
}

/// One point of the rebased relative-strength line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Growth proxy versus broad-market proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleSignal {
    pub growth_code: String,
    pub broad_code: String,
    pub current_ratio: Option<f64>,
    pub trend: StyleTrend,
    pub suggestion: StyleLeadership,
    pub description: String,
    pub ratio_series: Vec<RatioPoint>,
    pub ratio_ma: Vec<Option<f64>>,
}

/// Map NaN warmup values to `None`.
pub fn to_options(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| if v.is_nan() { None } else { Some(*v) })
        .collect()
}
