//! Domain types for MarketPulse

pub mod bar;
pub mod macro_data;
pub mod quote;
pub mod signal;

pub use bar::{IndexSeries, PriceBar};
pub use macro_data::{
    MacroSnapshot, MarginPoint, MarginProvenance, MarginSnapshot, MoneySupplyPoint,
    MoneySupplySnapshot,
};
pub use quote::RealtimeQuote;
pub use signal::{
    BoardSignal, FundingSignal, FundingStatus, PriceSource, RatioPoint, SentimentSignal,
    SentimentStatus, StyleLeadership, StyleSignal, StyleTrend, TimingSignal, TimingStatus,
    TrendSignal, TrendStatus,
};
