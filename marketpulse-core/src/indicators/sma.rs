//! Simple Moving Average (SMA) and the funding signal.
//!
//! Rolling mean over a lookback window.
//! First valid value at index window-1; a NaN anywhere in the window yields NaN.

use crate::domain::signal::to_options;
use crate::domain::{FundingSignal, FundingStatus};

/// Rolling mean of `values`.
pub fn sma_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    let mut nan_in_window = values[..window].iter().any(|v| v.is_nan());
    if !nan_in_window {
        result[window - 1] = sum / window as f64;
    }

    for i in window..n {
        let leaving = values[i - window];
        let entering = values[i];

        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            // Rescan: NaN poisons the running sum.
            let slice = &values[(i + 1 - window)..=i];
            nan_in_window = slice.iter().any(|v| v.is_nan());
            if nan_in_window {
                continue;
            }
            sum = slice.iter().sum();
        } else {
            sum = sum - leaving + entering;
        }

        result[i] = sum / window as f64;
    }

    result
}

/// Expanding when the latest volume exceeds its moving average.
pub fn funding(volumes: &[f64], window: usize) -> Option<FundingSignal> {
    let volume = *volumes.last()?;
    let series = sma_of_series(volumes, window);
    let volume_ma = *series.last()?;
    if volume.is_nan() || volume_ma.is_nan() {
        return None;
    }

    let status = if volume > volume_ma {
        FundingStatus::Expanding
    } else {
        FundingStatus::Contracting
    };

    Some(FundingSignal {
        volume,
        volume_ma,
        window,
        status,
        description: format!("volume vs {window}-day average"),
        volume_ma_series: to_options(&series),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_3_basic() {
        let result = sma_of_series(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 20.0, DEFAULT_EPSILON);
        assert_approx(result[3], 30.0, DEFAULT_EPSILON);
        assert_approx(result[4], 40.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_equals_input() {
        let result = sma_of_series(&[10.0, 20.0, 30.0], 1);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[2], 30.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_insufficient_data() {
        let result = sma_of_series(&[10.0, 20.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_nan_propagation() {
        let result = sma_of_series(&[10.0, f64::NAN, 30.0, 40.0, 50.0], 3);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert_approx(result[4], 40.0, DEFAULT_EPSILON);
    }

    #[test]
    fn funding_expanding_when_volume_spikes() {
        let mut volumes = vec![1000.0; 25];
        volumes.push(5000.0);
        let signal = funding(&volumes, 20).unwrap();
        assert_eq!(signal.status, FundingStatus::Expanding);
        assert_approx(signal.volume_ma, (19.0 * 1000.0 + 5000.0) / 20.0, DEFAULT_EPSILON);
        assert_eq!(signal.volume_ma_series.len(), volumes.len());
    }

    #[test]
    fn funding_unknown_latest_volume_is_none() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(f64::NAN);
        assert_eq!(funding(&volumes, 20), None);
    }

    #[test]
    fn funding_unknown_volume_inside_window_is_none() {
        let mut volumes = vec![1000.0; 25];
        volumes[15] = f64::NAN;
        assert_eq!(funding(&volumes, 20), None);
    }

    #[test]
    fn funding_equal_volume_is_contracting() {
        let volumes = vec![1000.0; 20];
        assert_eq!(funding(&volumes, 20).unwrap().status, FundingStatus::Contracting);
    }

    #[test]
    fn funding_needs_full_window() {
        assert!(funding(&[1000.0; 19], 20).is_none());
    }
}
