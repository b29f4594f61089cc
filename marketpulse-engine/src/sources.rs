//! The collaborators an analysis cycle pulls from.

use std::sync::Arc;
use std::time::Duration;

use marketpulse_core::data::{
    CircuitBreaker, CsvDirSource, DataError, EastmoneyMoneySupply, FallbackHistory,
    HistorySource, MarginFeed, MoneySupplySource, RealtimeSource, SseMarginFeed, SyntheticSource,
    SzseMarginFeed, TencentClient,
};
use marketpulse_core::time;

use crate::config::SourceConfig;

/// Exchange margin feeds, exchange A first.
pub struct MarginFeeds {
    pub exchange_a: Box<dyn MarginFeed>,
    pub exchange_b: Box<dyn MarginFeed>,
}

pub struct Sources {
    pub history: FallbackHistory,
    pub realtime: Option<Box<dyn RealtimeSource>>,
    pub margin: Option<MarginFeeds>,
    pub money_supply: Option<Box<dyn MoneySupplySource>>,
}

impl Sources {
    /// Only the given history strategies; no realtime or macro sources.
    pub fn history_only(history: Vec<Box<dyn HistorySource>>) -> Self {
        Self {
            history: FallbackHistory::new(history),
            realtime: None,
            margin: None,
            money_supply: None,
        }
    }

    pub fn with_realtime(mut self, realtime: Box<dyn RealtimeSource>) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn with_margin(
        mut self,
        exchange_a: Box<dyn MarginFeed>,
        exchange_b: Box<dyn MarginFeed>,
    ) -> Self {
        self.margin = Some(MarginFeeds {
            exchange_a,
            exchange_b,
        });
        self
    }

    pub fn with_money_supply(mut self, source: Box<dyn MoneySupplySource>) -> Self {
        self.money_supply = Some(source);
        self
    }

    /// Wire the production adapters described by `config`.
    ///
    /// History strategies run in the order Tencent, CSV directory, synthetic.
    /// Each provider host gets its own circuit breaker.
    pub fn from_config(config: &SourceConfig) -> Result<Self, DataError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut history: Vec<Box<dyn HistorySource>> = Vec::new();

        let tencent_breaker = Arc::new(CircuitBreaker::default_provider());
        if !config.offline {
            history.push(Box::new(
                TencentClient::new(timeout, Arc::clone(&tencent_breaker))?
                    .with_urls(&config.kline_url, &config.quote_url),
            ));
        }
        if let Some(dir) = &config.csv_dir {
            history.push(Box::new(CsvDirSource::new(dir.clone())));
        }
        if config.synthetic_fallback {
            history.push(Box::new(SyntheticSource::new(time::beijing_today())));
        }
        if history.is_empty() {
            return Err(DataError::Other(
                "no history source configured (offline without csv_dir or synthetic_fallback)"
                    .into(),
            ));
        }

        let mut sources = Self::history_only(history);
        if config.offline {
            tracing::info!("offline mode: realtime and macro sources disabled");
            return Ok(sources);
        }

        if config.realtime {
            sources = sources.with_realtime(Box::new(
                TencentClient::new(timeout, tencent_breaker)?
                    .with_urls(&config.kline_url, &config.quote_url),
            ));
        }

        let sse = SseMarginFeed::new(timeout, Arc::new(CircuitBreaker::default_provider()))?
            .with_url(&config.sse_margin_url);
        let szse = SzseMarginFeed::new(timeout, Arc::new(CircuitBreaker::default_provider()))?
            .with_url(&config.szse_margin_url)
            .with_history_days(config.szse_history_days);
        let eastmoney =
            EastmoneyMoneySupply::new(timeout, Arc::new(CircuitBreaker::default_provider()))?
                .with_url(&config.money_supply_url);

        Ok(sources
            .with_margin(Box::new(sse), Box::new(szse))
            .with_money_supply(Box::new(eastmoney)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_synthetic_has_no_network_sources() {
        let config = SourceConfig {
            offline: true,
            synthetic_fallback: true,
            ..SourceConfig::default()
        };
        let sources = Sources::from_config(&config).unwrap();
        assert_eq!(sources.history.source_names(), vec!["synthetic"]);
        assert!(sources.realtime.is_none());
        assert!(sources.margin.is_none());
        assert!(sources.money_supply.is_none());
    }

    #[test]
    fn offline_without_fallback_is_rejected() {
        let config = SourceConfig {
            offline: true,
            ..SourceConfig::default()
        };
        assert!(Sources::from_config(&config).is_err());
    }

    #[test]
    fn live_chain_orders_strategies() {
        let config = SourceConfig {
            csv_dir: Some("data".into()),
            synthetic_fallback: true,
            realtime: false,
            ..SourceConfig::default()
        };
        let sources = Sources::from_config(&config).unwrap();
        assert_eq!(
            sources.history.source_names(),
            vec!["tencent", "csv", "synthetic"]
        );
        assert!(sources.realtime.is_none());
        assert!(sources.margin.is_some());
    }
}
