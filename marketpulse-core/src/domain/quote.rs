//! Real-time snapshot quote.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Intraday snapshot for one index.
///
/// A quote is only usable when both the price and the cumulative day volume
/// are positive. Providers keep serving the previous session's snapshot with
/// zero volume while the market is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub code: String,
    pub name: String,
    pub last_price: f64,
    pub pct_change: Option<f64>,
    /// Cumulative volume for the session, in lots.
    pub volume: Option<u64>,
    pub amount: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub observed_at: DateTime<FixedOffset>,
}

impl RealtimeQuote {
    pub fn is_valid(&self) -> bool {
        self.last_price.is_finite()
            && self.last_price > 0.0
            && self.volume.is_some_and(|v| v > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::beijing_now;

    fn quote(price: f64, volume: u64) -> RealtimeQuote {
        RealtimeQuote {
            code: "sh000001".into(),
            name: "SSE Composite".into(),
            last_price: price,
            pct_change: Some(0.5),
            volume: Some(volume),
            amount: None,
            open: None,
            high: None,
            low: None,
            observed_at: beijing_now(),
        }
    }

    #[test]
    fn zero_volume_is_invalid() {
        assert!(!quote(3000.0, 0).is_valid());
    }

    #[test]
    fn zero_price_is_invalid() {
        assert!(!quote(0.0, 100).is_valid());
        assert!(!quote(f64::NAN, 100).is_valid());
    }

    #[test]
    fn positive_price_and_volume_is_valid() {
        assert!(quote(3000.0, 100).is_valid());
    }
}
