//! Source adapters, fallback chains and realtime merging.

pub mod circuit_breaker;
pub mod csv_dir;
pub mod fallback;
pub mod http;
pub mod margin;
pub mod merge;
pub mod money_supply;
pub mod provider;
pub mod synthetic;
pub mod tencent;

pub use circuit_breaker::CircuitBreaker;
pub use csv_dir::{read_series_csv, write_series_csv, CsvDirSource};
pub use fallback::{Attempt, FallbackChain, FallbackHistory, FallbackOutcome};
pub use margin::{
    fetch_margin_snapshot, join_on_date, reconcile_margin_units, MarginScale, SseMarginFeed,
    SzseMarginFeed, DEFAULT_SSE_URL, DEFAULT_SZSE_HISTORY_DAYS, DEFAULT_SZSE_URL,
};
pub use merge::merge_realtime;
pub use money_supply::{
    fetch_money_supply_snapshot, summarize_money_supply, EastmoneyMoneySupply,
    DEFAULT_EASTMONEY_URL,
};
pub use provider::{
    normalize_code, DataError, HistorySource, MarginFeed, MarginRecord,
    MoneySupplyRow, MoneySupplySource, RealtimeSource,
};
pub use synthetic::SyntheticSource;
pub use tencent::{TencentClient, DEFAULT_KLINE_URL, DEFAULT_QUOTE_URL};
