//! Volatility regime detection.
//!
//! Volatility is the rolling sample standard deviation (n-1) of daily percent
//! changes. Contraction means the current value ranks in the lowest band of
//! its own trailing history.

use super::IndicatorParams;
use crate::domain::signal::to_options;
use crate::domain::{TimingSignal, TimingStatus};

/// Rolling sample standard deviation. NaN until the window is full, and
/// wherever the window holds a NaN.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window < 2 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let ss: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum();
        result[i] = (ss / (window - 1) as f64).sqrt();
    }

    result
}

pub fn volatility_series(pct_changes: &[f64], window: usize) -> Vec<f64> {
    rolling_std(pct_changes, window)
}

/// Returns `(is_contracting, rank)`.
///
/// Rank is the share of the trailing `lookback` valid observations strictly
/// below the current value. With fewer observations than `lookback` (or a
/// missing current value) the result is `(false, 1.0)`.
pub fn detect_volatility_contraction(
    volatility: &[f64],
    lookback: usize,
    quantile: f64,
) -> (bool, f64) {
    let current = match volatility.last() {
        Some(v) if !v.is_nan() => *v,
        _ => return (false, 1.0),
    };

    let valid: Vec<f64> = volatility.iter().copied().filter(|v| !v.is_nan()).collect();
    if lookback == 0 || valid.len() < lookback {
        return (false, 1.0);
    }

    let window = &valid[valid.len() - lookback..];
    let below = window.iter().filter(|&&v| v < current).count();
    let rank = below as f64 / lookback as f64;

    (rank <= quantile, rank)
}

pub fn timing(pct_changes: &[f64], params: &IndicatorParams) -> TimingSignal {
    let series = volatility_series(pct_changes, params.volatility_window);
    let (is_contracting, volatility_rank) = detect_volatility_contraction(
        &series,
        params.volatility_lookback,
        params.contraction_quantile,
    );

    let status = if is_contracting {
        TimingStatus::Contracting
    } else {
        TimingStatus::Expanding
    };

    TimingSignal {
        volatility: series.last().copied().filter(|v| !v.is_nan()),
        volatility_rank,
        is_contracting,
        status,
        description: format!(
            "{}-day volatility rank over {} days",
            params.volatility_window, params.volatility_lookback
        ),
        volatility_series: to_options(&series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_std_is_sample_std() {
        // [2, 4, 4, 4, 5, 5, 7, 9]: mean 5, ss 32, sample var 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = rolling_std(&values, 8);
        assert!(result[6].is_nan());
        assert_approx(result[7], (32.0f64 / 7.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_constant_is_zero() {
        let result = rolling_std(&[1.5; 10], 4);
        assert!(result[2].is_nan());
        assert_approx(result[9], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_skips_leading_nan() {
        let result = rolling_std(&[f64::NAN, 1.0, 2.0, 3.0], 3);
        assert!(result[2].is_nan());
        assert_approx(result[3], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn minimum_of_lookback_contracts() {
        let mut vol: Vec<f64> = (0..59).map(|i| 2.0 + i as f64 * 0.01).collect();
        vol.push(0.5);
        let (contracting, rank) = detect_volatility_contraction(&vol, 60, 0.2);
        assert!(contracting);
        assert_eq!(rank, 0.0);
    }

    #[test]
    fn maximum_of_lookback_does_not_contract() {
        let mut vol: Vec<f64> = (0..59).map(|i| 1.0 + i as f64 * 0.01).collect();
        vol.push(9.0);
        let (contracting, rank) = detect_volatility_contraction(&vol, 60, 0.2);
        assert!(!contracting);
        assert_approx(rank, 59.0 / 60.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_history_reports_not_contracting() {
        let vol = vec![1.0; 59];
        assert_eq!(detect_volatility_contraction(&vol, 60, 0.2), (false, 1.0));
    }

    #[test]
    fn warmup_nan_does_not_count_as_observation() {
        let mut vol = vec![f64::NAN; 30];
        vol.extend(vec![1.0; 40]);
        assert_eq!(detect_volatility_contraction(&vol, 60, 0.2), (false, 1.0));
    }

    #[test]
    fn rank_at_quantile_boundary_contracts() {
        // 12 of 60 strictly below the current value: rank 0.2
        let mut vol: Vec<f64> = vec![1.0; 12];
        vol.extend(vec![3.0; 47]);
        vol.push(2.0);
        let (contracting, rank) = detect_volatility_contraction(&vol, 60, 0.2);
        assert_approx(rank, 0.2, DEFAULT_EPSILON);
        assert!(contracting);
    }

    #[test]
    fn timing_on_short_series_is_expanding() {
        let signal = timing(&[0.1, -0.2, 0.3], &IndicatorParams::default());
        assert!(!signal.is_contracting);
        assert_eq!(signal.volatility_rank, 1.0);
        assert_eq!(signal.status, TimingStatus::Expanding);
        assert_eq!(signal.volatility, None);
    }
}
