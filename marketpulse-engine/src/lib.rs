//! MarketPulse engine: the analysis cycle on top of `marketpulse-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every field
//! - Source wiring (history fallback chain, realtime, macro feeds)
//! - The per-cycle orchestrator and its snapshot / error shapes
//! - Optional language-model commentary
//! - JSON and CSV export of a snapshot

pub mod board;
pub mod commentary;
pub mod config;
pub mod engine;
pub mod export;
pub mod snapshot;
pub mod sources;

pub use board::analyze_board;
pub use commentary::{
    build_commentary_input, Commentator, CommentaryError, GeminiCommentator, NOT_AVAILABLE,
};
pub use config::{CommentaryConfig, ConfigError, EngineConfig, SourceConfig, WatchedIndex};
pub use engine::{AnalysisError, MarketSignalEngine};
pub use export::{export_json, export_outcome, export_snapshot, export_style_csv, ExportError};
pub use snapshot::{
    fingerprint, AnalysisOutcome, BoardFailure, BoardResult, HistoryProvenance, MarketSnapshot,
    StyleResult,
};
pub use sources::{MarginFeeds, Sources};
