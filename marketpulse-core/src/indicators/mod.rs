//! Indicator library.
//!
//! Pure functions over a single index's series (or, for relative strength,
//! a pair of series). Each family has a low-level `*_series` helper that
//! works on raw `f64` slices with NaN as the warmup marker, and a signal
//! builder that classifies the latest value.

pub mod bias;
pub mod ema;
pub mod relative_strength;
pub mod sma;
pub mod volatility;

pub use bias::{bias_series, classify_bias, sentiment};
pub use ema::{ema_of_series, trend};
pub use relative_strength::{classify_style, relative_strength, style_signal, RelativeStrength};
pub use sma::{funding, sma_of_series};
pub use volatility::{detect_volatility_contraction, rolling_std, timing, volatility_series};

use serde::{Deserialize, Serialize};

/// Bias thresholds in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentThresholds {
    /// Above this bias the market is overheated.
    pub overheated: f64,
    /// Below this bias the market is in panic.
    pub panic: f64,
    /// At or below this bias the panic is extreme.
    pub extreme_panic: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            overheated: 5.0,
            panic: -5.0,
            extreme_panic: -7.0,
        }
    }
}

/// Windows and thresholds shared by every indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ema_span: usize,
    /// Window for the price SMA (bias) and the volume SMA (funding).
    pub ma_window: usize,
    pub volatility_window: usize,
    pub volatility_lookback: usize,
    pub contraction_quantile: f64,
    pub rs_window: usize,
    pub sentiment: SentimentThresholds,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_span: 200,
            ma_window: 20,
            volatility_window: 20,
            volatility_lookback: 60,
            contraction_quantile: 0.2,
            rs_window: 20,
            sentiment: SentimentThresholds::default(),
        }
    }
}

impl IndicatorParams {
    /// Fewest bars for which every short-window indicator has a value.
    pub fn min_history(&self) -> usize {
        self.ma_window.max(1)
    }
}

/// Create a synthetic series from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> crate::domain::IndexSeries {
    use crate::domain::{IndexSeries, PriceBar};
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: Some(1000),
                amount: None,
                pct_change: None,
            }
        })
        .collect();
    IndexSeries::new("TEST", "Test Index", bars)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
