//! Bias: percentage deviation of price from its moving average.
//!
//! bias = (close - SMA(close)) / SMA(close) * 100. Unbounded, never clamped.

use super::sma::sma_of_series;
use super::SentimentThresholds;
use crate::domain::signal::to_options;
use crate::domain::{SentimentSignal, SentimentStatus};

pub fn bias_series(closes: &[f64], window: usize) -> Vec<f64> {
    let ma = sma_of_series(closes, window);
    closes
        .iter()
        .zip(&ma)
        .map(|(&c, &m)| {
            if m.is_nan() || m == 0.0 {
                f64::NAN
            } else {
                (c - m) / m * 100.0
            }
        })
        .collect()
}

/// Overheated above the upper threshold; extreme panic at or below the
/// severe threshold, panic below the lower one, neutral in between.
pub fn classify_bias(score: f64, thresholds: &SentimentThresholds) -> SentimentStatus {
    if score > thresholds.overheated {
        SentimentStatus::Overheated
    } else if score <= thresholds.extreme_panic {
        SentimentStatus::ExtremePanic
    } else if score < thresholds.panic {
        SentimentStatus::Panic
    } else {
        SentimentStatus::Neutral
    }
}

pub fn sentiment(
    closes: &[f64],
    window: usize,
    thresholds: &SentimentThresholds,
) -> Option<SentimentSignal> {
    let series = bias_series(closes, window);
    let score = *series.last()?;
    if score.is_nan() {
        return None;
    }
    let price_ma = *sma_of_series(closes, window).last()?;

    Some(SentimentSignal {
        score,
        price_ma,
        status: classify_bias(score, thresholds),
        description: format!("bias vs {window}-day average"),
        bias_series: to_options(&series),
    })
}
