//! Exponential Moving Average (EMA) and the trend signal.
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1).
//! Seed: EMA[0] = first non-NaN value (no SMA warmup, no bias adjustment).

use crate::domain::signal::to_options;
use crate::domain::{TrendSignal, TrendStatus};

/// EMA of an arbitrary series.
///
/// Values before the first non-NaN input are NaN. A NaN after the seed
/// carries the previous EMA forward.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if span == 0 {
        return result;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        let next = match (prev, v.is_nan()) {
            (None, true) => continue,
            (None, false) => v,
            (Some(p), true) => p,
            (Some(p), false) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = next;
        prev = Some(next);
    }

    result
}

/// Bull when the latest close is above its EMA, bear otherwise.
pub fn trend(closes: &[f64], span: usize) -> Option<TrendSignal> {
    let current_price = *closes.last()?;
    let series = ema_of_series(closes, span);
    let ema = *series.last()?;
    if current_price.is_nan() || ema.is_nan() {
        return None;
    }

    let status = if current_price > ema {
        TrendStatus::Bull
    } else {
        TrendStatus::Bear
    };

    Some(TrendSignal {
        current_price,
        ema,
        span,
        status,
        description: format!("price vs EMA{span}"),
        ema_series: to_options(&series),
    })
}
