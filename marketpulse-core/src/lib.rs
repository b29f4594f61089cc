//! MarketPulse core: domain types, time normalization, source adapters and indicators.
//!
//! This crate holds everything below the orchestrator:
//! - Domain types (price bars, index series, realtime quotes, macro snapshots, signals)
//! - Time normalizer for the date/timestamp shapes upstream providers emit
//! - Source adapters behind traits, fallback chains and the realtime merge
//! - Margin unit reconciliation and money supply summarization
//! - Pure indicator library (EMA, SMA, bias, volatility regime, relative strength)

pub mod data;
pub mod domain;
pub mod indicators;
pub mod time;
