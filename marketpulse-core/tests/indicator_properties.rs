//! Property tests for indicator invariants.
//!
//! Uses proptest to verify:
//! 1. EMA of a constant series is the constant, and the first value is the seed
//! 2. Bias is zero (and neutral) whenever price equals its moving average
//! 3. Volatility rank stays within [0, 1] and short series never contract
//! 4. Relative strength starts at exactly 100 and ignores common rescaling
//! 5. Margin reconciliation leaves consistent units alone

use proptest::prelude::*;

use chrono::NaiveDate;
use marketpulse_core::data::reconcile_margin_units;
use marketpulse_core::domain::{IndexSeries, PriceBar, SentimentStatus};
use marketpulse_core::indicators::{
    detect_volatility_contraction, ema_of_series, relative_strength, sentiment,
    SentimentThresholds,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (100.0..5000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 2..max_len)
}

fn series(code: &str, closes: &[f64]) -> IndexSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1_000),
            amount: None,
            pct_change: None,
        })
        .collect();
    IndexSeries::new(code, code, bars)
}

// ── 1. EMA ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ema_of_constant_is_constant(value in arb_price(), len in 1usize..600, span in 1usize..300) {
        let ema = ema_of_series(&vec![value; len], span);
        prop_assert_eq!(ema[0], value);
        for v in ema {
            prop_assert!((v - value).abs() <= 1e-9 * value);
        }
    }

    #[test]
    fn ema_stays_within_input_range(closes in arb_closes(300), span in 1usize..250) {
        let lo = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for v in ema_of_series(&closes, span) {
            prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
    }
}

// ── 2. Bias ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flat_window_has_zero_bias(value in 100u32..5000, extra in 0usize..40) {
        // Whole prices keep the rolling sum exact.
        let closes = vec![f64::from(value); 20 + extra];
        let signal = sentiment(&closes, 20, &SentimentThresholds::default()).unwrap();
        prop_assert_eq!(signal.score, 0.0);
        prop_assert_eq!(signal.status, SentimentStatus::Neutral);
    }
}

// ── 3. Volatility rank ───────────────────────────────────────────────

proptest! {
    #[test]
    fn rank_is_a_fraction(vol in prop::collection::vec(0.01..5.0_f64, 60..200)) {
        let (contracting, rank) = detect_volatility_contraction(&vol, 60, 0.2);
        prop_assert!((0.0..=1.0).contains(&rank));
        prop_assert_eq!(contracting, rank <= 0.2);
    }

    #[test]
    fn short_history_never_contracts(vol in prop::collection::vec(0.01..5.0_f64, 0..60)) {
        prop_assert_eq!(detect_volatility_contraction(&vol, 60, 0.2), (false, 1.0));
    }
}

// ── 4. Relative strength ─────────────────────────────────────────────

proptest! {
    #[test]
    fn rebased_ratio_starts_at_100(a in arb_closes(120), b in arb_closes(120)) {
        let rs = relative_strength(&series("A", &a), &series("B", &b), 20);
        prop_assert_eq!(rs.points[0].value, Some(100.0));
        prop_assert_eq!(rs.points.len(), a.len().min(b.len()));
        prop_assert_eq!(rs.ma.len(), rs.points.len());
    }

    #[test]
    fn rescaling_both_inputs_is_invisible(
        pairs in prop::collection::vec((arb_price(), arb_price()), 2..120),
        k in 0.01..100.0_f64,
    ) {
        let a: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let b: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let ka: Vec<f64> = a.iter().map(|v| v * k).collect();
        let kb: Vec<f64> = b.iter().map(|v| v * k).collect();

        let base = relative_strength(&series("A", &a), &series("B", &b), 20);
        let scaled = relative_strength(&series("A", &ka), &series("B", &kb), 20);
        for (x, y) in base.points.iter().zip(&scaled.points) {
            let (x, y) = (x.value.unwrap(), y.value.unwrap());
            prop_assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }
}

// ── 5. Margin reconciliation ─────────────────────────────────────────

proptest! {
    #[test]
    fn same_order_of_magnitude_is_untouched(a in 2e11..2e12_f64, ratio in 0.05..2.5_f64) {
        let scale = reconcile_margin_units(a, a * ratio);
        prop_assert_eq!(scale.exchange_a, 1.0);
        prop_assert_eq!(scale.exchange_b, 1.0);
    }

    #[test]
    fn ten_thousand_unit_b_is_lifted(a in 2e11..2e12_f64, ratio in 0.2..2.5_f64) {
        let b_small = a * ratio / 1e4;
        let scale = reconcile_margin_units(a, b_small);
        let corrected = b_small * scale.exchange_b;
        prop_assert!((corrected / a - ratio).abs() < 1e-9);
    }
}
