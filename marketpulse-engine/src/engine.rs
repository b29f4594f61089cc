//! One analysis cycle, end to end.
//!
//! 1. Fetch every watched index through the history fallback chain.
//! 2. Merge one batched realtime fetch into the histories.
//! 3. Build a board signal per usable index and the style signal.
//! 4. Fetch the macro snapshot once.
//! 5. Ask the commentator, if any.
//!
//! No state survives between cycles. Per-index problems become board errors,
//! even when every index fails; only a panic or a fatal error fails the cycle
//! as a whole.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use chrono::NaiveDate;
use rayon::prelude::*;

use marketpulse_core::data::{
    fetch_margin_snapshot, fetch_money_supply_snapshot, merge_realtime, DataError,
    FallbackOutcome,
};
use marketpulse_core::domain::{
    IndexSeries, MacroSnapshot, MarginSnapshot, MoneySupplySnapshot, RealtimeQuote,
};
use marketpulse_core::indicators::style_signal;
use marketpulse_core::time;

use crate::board::analyze_board;
use crate::commentary::{build_commentary_input, placeholder, Commentator, GeminiCommentator};
use crate::config::{EngineConfig, WatchedIndex};
use crate::snapshot::{
    fingerprint, AnalysisOutcome, BoardFailure, BoardResult, HistoryProvenance, MarketSnapshot,
    StyleResult,
};
use crate::sources::Sources;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{code}: {bars} bars, at least {required} required")]
    InsufficientHistory {
        code: String,
        bars: usize,
        required: usize,
    },

    #[error("indicator failure: {0}")]
    Indicator(String),

    #[error("panic during analysis: {0}")]
    Panicked(String),
}

pub struct MarketSignalEngine {
    config: EngineConfig,
    sources: Sources,
    commentator: Option<Box<dyn Commentator>>,
    today: Option<NaiveDate>,
}

/// A watched index after the history stage.
struct Fetched<'a> {
    index: &'a WatchedIndex,
    history: Result<FallbackOutcome<IndexSeries>, AnalysisError>,
}

impl MarketSignalEngine {
    pub fn new(config: EngineConfig, sources: Sources) -> Self {
        Self {
            config,
            sources,
            commentator: None,
            today: None,
        }
    }

    /// Production wiring: live adapters plus Gemini commentary when enabled
    /// and a key is present.
    pub fn from_config(config: EngineConfig) -> Result<Self, AnalysisError> {
        let sources = Sources::from_config(&config.sources)?;
        let commentator: Option<Box<dyn Commentator>> = if config.commentary.enabled {
            match GeminiCommentator::from_config(&config.commentary) {
                Ok(gemini) => Some(Box::new(gemini)),
                Err(e) => {
                    tracing::info!(error = %e, "commentary disabled");
                    None
                }
            }
        } else {
            None
        };

        let mut engine = Self::new(config, sources);
        engine.commentator = commentator;
        Ok(engine)
    }

    pub fn with_commentator(mut self, commentator: Box<dyn Commentator>) -> Self {
        self.commentator = Some(commentator);
        self
    }

    /// Pin the calendar date used for macro windows.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Never fails: errors and panics become [`AnalysisOutcome::Failed`].
    pub fn run_cycle(&self) -> AnalysisOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.analyze()))
            .unwrap_or_else(|payload| Err(AnalysisError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(snapshot) => AnalysisOutcome::Snapshot(Box::new(snapshot)),
            Err(e) => {
                tracing::error!(error = %e, "analysis cycle failed");
                AnalysisOutcome::Failed {
                    error: format!("Analysis failed: {e}"),
                }
            }
        }
    }

    pub fn analyze(&self) -> Result<MarketSnapshot, AnalysisError> {
        let params = &self.config.indicators;
        let fetched = self.fetch_histories();

        let as_of = fetched
            .iter()
            .filter_map(|f| f.history.as_ref().ok())
            .filter_map(|outcome| outcome.value.last_date())
            .max();

        let quotes = self.fetch_quotes(&fetched);

        let mut boards = Vec::with_capacity(fetched.len());
        let mut analyzed: BTreeMap<&str, IndexSeries> = BTreeMap::new();
        let mut provenance = Vec::with_capacity(fetched.len());

        for Fetched { index, history } in fetched {
            provenance.push(HistoryProvenance {
                key: index.key.clone(),
                code: index.code.clone(),
                strategy: history.as_ref().ok().map(|o| o.strategy.clone()),
                attempts: history
                    .as_ref()
                    .map(|o| o.attempts.clone())
                    .unwrap_or_default(),
            });

            let result = history.and_then(|outcome| {
                let series = outcome.value.with_name(&index.name);
                let (merged, source) = merge_realtime(&series, quotes.get(series.code()));
                let signal = analyze_board(index, &merged, source, params)?;
                analyzed.insert(index.key.as_str(), merged);
                Ok(signal)
            });

            match result {
                Ok(signal) => boards.push(BoardResult::Ok(Box::new(signal))),
                Err(e) => {
                    tracing::warn!(key = %index.key, code = %index.code, error = %e, "board unavailable");
                    boards.push(BoardResult::Failed(BoardFailure {
                        key: index.key.clone(),
                        name: index.name.clone(),
                        code: index.code.clone(),
                        error: e.to_string(),
                    }));
                }
            }
        }

        if analyzed.is_empty() {
            tracing::warn!(boards = boards.len(), "no index produced a usable series");
        }

        let style = match (
            analyzed.get(self.config.growth_proxy.as_str()),
            analyzed.get(self.config.broad_proxy.as_str()),
        ) {
            (Some(growth), Some(broad)) => style_signal(growth, broad, params.rs_window)
                .map(|s| StyleResult::Ok(Box::new(s)))
                .unwrap_or_else(StyleResult::insufficient),
            _ => StyleResult::insufficient(),
        };

        let macro_data = self.fetch_macro();

        let ordered: Vec<&IndexSeries> = self
            .config
            .watchlist
            .iter()
            .filter_map(|w| analyzed.get(w.key.as_str()))
            .collect();
        let fingerprint = fingerprint(&ordered);

        let commentary = self.commentator.as_ref().map(|commentator| {
            let representative = boards
                .iter()
                .find(|b| b.key() == self.config.representative)
                .and_then(BoardResult::signal);
            let input = build_commentary_input(&macro_data, representative);
            commentator.summarize(&input).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "commentary failed");
                placeholder(&e)
            })
        });

        tracing::info!(
            boards = boards.len(),
            usable = analyzed.len(),
            as_of = ?as_of,
            "analysis cycle complete"
        );

        Ok(MarketSnapshot {
            as_of,
            generated_at: time::beijing_now(),
            boards,
            style,
            macro_data,
            commentary,
            provenance,
            fingerprint,
        })
    }

    fn fetch_histories(&self) -> Vec<Fetched<'_>> {
        let lookback = self.config.history_lookback_days;
        let fetch_one = |index: &WatchedIndex| {
            self.sources
                .history
                .fetch_with_attempts(&index.code, lookback)
                .map(|outcome| {
                    tracing::debug!(
                        code = %index.code,
                        strategy = %outcome.strategy,
                        bars = outcome.value.len(),
                        "history fetched"
                    );
                    outcome
                })
                .map_err(AnalysisError::from)
        };

        let watchlist = &self.config.watchlist;
        let results: Vec<_> = if self.config.sources.parallel {
            watchlist.par_iter().map(fetch_one).collect()
        } else {
            watchlist.iter().map(fetch_one).collect()
        };

        watchlist
            .iter()
            .zip(results)
            .map(|(index, history)| Fetched { index, history })
            .collect()
    }

    fn fetch_quotes(&self, fetched: &[Fetched<'_>]) -> BTreeMap<String, RealtimeQuote> {
        let Some(realtime) = self
            .sources
            .realtime
            .as_ref()
            .filter(|_| self.config.sources.realtime)
        else {
            return BTreeMap::new();
        };

        let codes: Vec<String> = fetched
            .iter()
            .filter_map(|f| f.history.as_ref().ok())
            .map(|outcome| outcome.value.code().to_string())
            .collect();
        if codes.is_empty() {
            return BTreeMap::new();
        }

        match realtime.fetch_realtime(&codes) {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(source = realtime.name(), error = %e, "realtime quotes unavailable");
                BTreeMap::new()
            }
        }
    }

    fn fetch_macro(&self) -> MacroSnapshot {
        let today = self.today.unwrap_or_else(time::beijing_today);
        let margin = match &self.sources.margin {
            Some(feeds) => fetch_margin_snapshot(
                feeds.exchange_a.as_ref(),
                feeds.exchange_b.as_ref(),
                today,
                self.config.margin_window_days,
            ),
            None => MarginSnapshot::unavailable("margin source disabled"),
        };
        let money_supply = match &self.sources.money_supply {
            Some(source) => fetch_money_supply_snapshot(source.as_ref()),
            None => MoneySupplySnapshot::unavailable("money supply source disabled"),
        };
        MacroSnapshot::new(margin, money_supply)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
