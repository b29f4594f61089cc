//! Per-index signal assembly.

use marketpulse_core::domain::{BoardSignal, IndexSeries, PriceSource};
use marketpulse_core::indicators::{funding, sentiment, timing, trend, IndicatorParams};

use crate::config::WatchedIndex;
use crate::engine::AnalysisError;

/// Run every indicator family over one (already merged) series.
pub fn analyze_board(
    index: &WatchedIndex,
    series: &IndexSeries,
    price_source: PriceSource,
    params: &IndicatorParams,
) -> Result<BoardSignal, AnalysisError> {
    let min = params.min_history();
    if series.len() < min {
        return Err(AnalysisError::InsufficientHistory {
            code: series.code().to_string(),
            bars: series.len(),
            required: min,
        });
    }
    let as_of = series
        .last_date()
        .ok_or_else(|| AnalysisError::Indicator(format!("{}: empty series", series.code())))?;

    let closes = series.closes();
    let volumes = series.volumes();
    let missing = |family: &str| {
        AnalysisError::Indicator(format!("{}: no {family} value", series.code()))
    };

    let trend = trend(&closes, params.ema_span).ok_or_else(|| missing("trend"))?;
    let funding = funding(&volumes, params.ma_window);
    if funding.is_none() {
        tracing::debug!(code = series.code(), "volume unknown in funding window");
    }
    let sentiment = sentiment(&closes, params.ma_window, &params.sentiment)
        .ok_or_else(|| missing("sentiment"))?;
    let timing = timing(&series.pct_changes(), params);

    Ok(BoardSignal {
        key: index.key.clone(),
        code: series.code().to_string(),
        name: index.name.clone(),
        as_of,
        price_source,
        funding,
        sentiment,
        trend,
        timing,
        bars: series.bars().to_vec(),
    })
}
