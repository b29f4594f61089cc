//! The value an analysis cycle produces.
//!
//! Partial failures stay inside the snapshot: a board that could not be
//! analyzed serializes as `{"name", "code", "error"}` and a missing style
//! signal as `{"error"}`. Only a failed cycle as a whole becomes the bare
//! `{"error": "..."}` of [`AnalysisOutcome::Failed`].

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use marketpulse_core::data::Attempt;
use marketpulse_core::domain::{BoardSignal, IndexSeries, MacroSnapshot, StyleSignal};

/// Error text for a style signal that could not be built.
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardFailure {
    pub key: String,
    pub name: String,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoardResult {
    Ok(Box<BoardSignal>),
    Failed(BoardFailure),
}

impl BoardResult {
    pub fn key(&self) -> &str {
        match self {
            BoardResult::Ok(signal) => &signal.key,
            BoardResult::Failed(failure) => &failure.key,
        }
    }

    pub fn signal(&self) -> Option<&BoardSignal> {
        match self {
            BoardResult::Ok(signal) => Some(&**signal),
            BoardResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BoardResult::Ok(_) => None,
            BoardResult::Failed(failure) => Some(&failure.error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StyleResult {
    Ok(Box<StyleSignal>),
    Failed { error: String },
}

impl StyleResult {
    pub fn insufficient() -> Self {
        StyleResult::Failed {
            error: INSUFFICIENT_DATA.to_string(),
        }
    }

    pub fn signal(&self) -> Option<&StyleSignal> {
        match self {
            StyleResult::Ok(signal) => Some(&**signal),
            StyleResult::Failed { .. } => None,
        }
    }
}

/// Which history strategy served each index, with the failed attempts before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryProvenance {
    pub key: String,
    pub code: String,
    pub strategy: Option<String>,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    /// Latest bar date across the fetched histories, before realtime merging.
    pub as_of: Option<NaiveDate>,
    pub generated_at: DateTime<FixedOffset>,
    /// Boards in watch-list order.
    pub boards: Vec<BoardResult>,
    pub style: StyleResult,
    #[serde(rename = "macro")]
    pub macro_data: MacroSnapshot,
    pub commentary: Option<String>,
    pub provenance: Vec<HistoryProvenance>,
    /// BLAKE3 digest of every analyzed series.
    pub fingerprint: String,
}

impl MarketSnapshot {
    pub fn board(&self, key: &str) -> Option<&BoardResult> {
        self.boards.iter().find(|b| b.key() == key)
    }

    pub fn signal(&self, key: &str) -> Option<&BoardSignal> {
        self.board(key).and_then(BoardResult::signal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Snapshot(Box<MarketSnapshot>),
    Failed { error: String },
}

impl AnalysisOutcome {
    pub fn snapshot(&self) -> Option<&MarketSnapshot> {
        match self {
            AnalysisOutcome::Snapshot(snapshot) => Some(&**snapshot),
            AnalysisOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Snapshot(_) => None,
            AnalysisOutcome::Failed { error } => Some(error),
        }
    }
}

/// Hash code, dates and OHLCV of every series, in the order given.
pub fn fingerprint(series: &[&IndexSeries]) -> String {
    let mut hasher = blake3::Hasher::new();
    for s in series {
        hasher.update(s.code().as_bytes());
        hasher.update(&(s.len() as u64).to_le_bytes());
        for bar in s.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            match bar.volume {
                Some(v) => hasher.update(&[1]).update(&v.to_le_bytes()),
                None => hasher.update(&[0]),
            };
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketpulse_core::domain::PriceBar;

    fn series(code: &str, closes: &[f64]) -> IndexSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: Some(100),
                amount: None,
                pct_change: None,
            })
            .collect();
        IndexSeries::new(code, code, bars)
    }

    #[test]
    fn fingerprint_is_deterministic_and_order_sensitive() {
        let a = series("sh000001", &[1.0, 2.0, 3.0]);
        let b = series("sz399006", &[4.0, 5.0]);
        assert_eq!(fingerprint(&[&a, &b]), fingerprint(&[&a, &b]));
        assert_ne!(fingerprint(&[&a, &b]), fingerprint(&[&b, &a]));
        assert_eq!(fingerprint(&[&a]).len(), 64);
    }

    #[test]
    fn fingerprint_sees_price_changes() {
        let a = series("sh000001", &[1.0, 2.0, 3.0]);
        let b = series("sh000001", &[1.0, 2.0, 3.5]);
        assert_ne!(fingerprint(&[&a]), fingerprint(&[&b]));
    }

    #[test]
    fn failures_serialize_flat() {
        let board = BoardResult::Failed(BoardFailure {
            key: "sz".into(),
            name: "深证成指".into(),
            code: "sz399001".into(),
            error: "network unreachable".into(),
        });
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["code"], "sz399001");
        assert_eq!(json["error"], "network unreachable");

        let style = serde_json::to_value(StyleResult::insufficient()).unwrap();
        assert_eq!(style, serde_json::json!({"error": "Insufficient data"}));

        let outcome = AnalysisOutcome::Failed {
            error: "Analysis failed: boom".into(),
        };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"error":"Analysis failed: boom"}"#
        );
    }
}
