//! Realtime quote merge.
//!
//! A valid quote dated the same day as the last bar replaces that bar; a
//! quote from a later day appends a new bar. Invalid, missing or stale
//! quotes leave the history untouched.

use crate::domain::{IndexSeries, PriceBar, PriceSource, RealtimeQuote};

pub fn merge_realtime(
    series: &IndexSeries,
    quote: Option<&RealtimeQuote>,
) -> (IndexSeries, PriceSource) {
    if quote.is_some_and(|q| !q.is_valid()) {
        tracing::debug!(code = series.code(), "invalid realtime quote; using last bar");
    }
    let (Some(quote), Some(last)) = (quote.filter(|q| q.is_valid()), series.last()) else {
        return (series.clone(), PriceSource::History);
    };

    let quote_date = quote.observed_at.date_naive();
    if quote_date < last.date {
        tracing::debug!(code = series.code(), %quote_date, "stale realtime quote ignored");
        return (series.clone(), PriceSource::History);
    }

    let price = quote.last_price;
    let live = PriceBar {
        date: quote_date,
        open: quote.open.unwrap_or(price),
        high: quote.high.unwrap_or(price).max(price),
        low: quote.low.unwrap_or(price).min(price),
        close: price,
        volume: quote.volume,
        amount: quote.amount,
        pct_change: quote.pct_change,
    };

    let mut bars = series.bars().to_vec();
    if quote_date == last.date {
        if let Some(slot) = bars.last_mut() {
            *slot = live;
        }
    } else {
        bars.push(live);
    }

    (
        IndexSeries::new(series.code(), series.name(), bars),
        PriceSource::Realtime,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;
    use chrono::{NaiveDate, TimeZone};

    fn series() -> IndexSeries {
        let bar = |d: u32, close: f64| PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 12, d).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1000),
            amount: None,
            pct_change: None,
        };
        IndexSeries::new("sh000001", "SSE", vec![bar(18, 3300.0), bar(19, 3310.0)])
    }

    fn quote(day: u32, price: f64, volume: u64) -> RealtimeQuote {
        RealtimeQuote {
            code: "sh000001".into(),
            name: "SSE".into(),
            last_price: price,
            pct_change: Some(0.3),
            volume: Some(volume),
            amount: None,
            open: None,
            high: Some(3400.0),
            low: None,
            observed_at: time::beijing()
                .with_ymd_and_hms(2024, 12, day, 14, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn same_day_quote_replaces_last_bar() {
        let (merged, source) = merge_realtime(&series(), Some(&quote(19, 3320.0, 5000)));
        assert_eq!(source, PriceSource::Realtime);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.last().unwrap().close, 3320.0);
        assert_eq!(merged.last().unwrap().volume, Some(5000));
    }

    #[test]
    fn later_day_quote_appends_bar() {
        let (merged, _) = merge_realtime(&series(), Some(&quote(20, 3320.0, 5000)));
        assert_eq!(merged.len(), 3);
        let last = merged.last().unwrap();
        assert_eq!(last.open, 3320.0);
        assert_eq!(last.high, 3400.0);
        assert_eq!(last.low, 3320.0);
        assert_eq!(last.pct_change, Some(0.3));
    }

    #[test]
    fn zero_volume_quote_is_rejected() {
        let history = series();
        let (merged, source) = merge_realtime(&history, Some(&quote(20, 3320.0, 0)));
        assert_eq!(source, PriceSource::History);
        assert_eq!(merged, history);
        assert_eq!(merged.last().unwrap().close, 3310.0);
        assert_eq!(merged.last().unwrap().volume, Some(1000));
    }

    #[test]
    fn stale_or_missing_quote_keeps_history() {
        let history = series();
        assert_eq!(merge_realtime(&history, None).1, PriceSource::History);
        let (merged, source) = merge_realtime(&history, Some(&quote(18, 3320.0, 10)));
        assert_eq!(source, PriceSource::History);
        assert_eq!(merged, history);
    }
}
