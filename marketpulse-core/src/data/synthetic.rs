//! Synthetic history for offline demos.
//!
//! A random walk seeded from the BLAKE3 hash of the code, so the same code
//! and end date always yield the same bars. These bars are clearly fake and
//! are only used when explicitly enabled.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{normalize_code, DataError, HistorySource};
use crate::domain::{IndexSeries, PriceBar};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    end: NaiveDate,
    start_price: f64,
    /// Mean daily return added to every step.
    drift: f64,
}

impl SyntheticSource {
    pub fn new(end: NaiveDate) -> Self {
        Self {
            end,
            start_price: 3000.0,
            drift: 0.0,
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    /// Exactly `count` weekday bars ending on or before `end`.
    pub fn generate(&self, code: &str, count: usize) -> Vec<PriceBar> {
        let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let dates = weekdays_back(self.end, count);
        let mut bars = Vec::with_capacity(count);
        let mut price = self.start_price;

        for date in dates {
            let daily_return: f64 = self.drift + rng.gen_range(-0.02f64..0.02);
            let open = price;
            let close = (price * (1.0 + daily_return)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0f64..0.008));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0f64..0.008));
            let volume = rng.gen_range(200_000_000..400_000_000u64);

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: Some(volume),
                amount: Some(volume as f64 * close),
                pct_change: None,
            });
            price = close;
        }

        bars
    }
}

fn weekdays_back(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = end;
    while dates.len() < count {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        match current.pred_opt() {
            Some(prev) => current = prev,
            None => break,
        }
    }
    dates.reverse();
    dates
}

impl HistorySource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_history(&self, code: &str, lookback_days: usize) -> Result<IndexSeries, DataError> {
        let code = normalize_code(code);
        tracing::warn!(code = %code, "generating synthetic history");
        let bars = self.generate(&code, lookback_days);
        Ok(IndexSeries::new(code.clone(), code, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let source = SyntheticSource::new(end());
        assert_eq!(source.generate("sh000001", 50), source.generate("sh000001", 50));
    }

    #[test]
    fn different_codes_get_different_walks() {
        let source = SyntheticSource::new(end());
        let a = source.generate("sh000001", 50);
        let b = source.generate("sz399006", 50);
        assert_ne!(a.last().unwrap().close, b.last().unwrap().close);
    }

    #[test]
    fn bars_are_weekdays_ending_at_end() {
        let series = SyntheticSource::new(end()).fetch_history("sh000001", 400).unwrap();
        assert_eq!(series.len(), 400);
        assert_eq!(series.last_date(), Some(end()));
        assert!(series
            .dates()
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(series.bars().iter().all(|b| b.is_sane()));
    }

    #[test]
    fn drift_steers_the_walk() {
        let up = SyntheticSource::new(end()).with_drift(0.01).generate("x", 300);
        let down = SyntheticSource::new(end()).with_drift(-0.01).generate("x", 300);
        assert!(up.last().unwrap().close > 3000.0);
        assert!(down.last().unwrap().close < 3000.0);
    }
}
