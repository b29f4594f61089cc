//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard three-board watch list with live Tencent history, exchange margin
//! feeds and Eastmoney money supply.

use std::path::{Path, PathBuf};

use marketpulse_core::data::{
    DEFAULT_EASTMONEY_URL, DEFAULT_KLINE_URL, DEFAULT_QUOTE_URL, DEFAULT_SSE_URL,
    DEFAULT_SZSE_HISTORY_DAYS, DEFAULT_SZSE_URL,
};
use marketpulse_core::indicators::IndicatorParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One index on the watch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedIndex {
    /// Short key used in output and proxy references (`sh`, `cyb`).
    pub key: String,
    /// Provider code with exchange prefix (`sh000001`).
    pub code: String,
    pub name: String,
}

impl WatchedIndex {
    pub fn new(key: &str, code: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub watchlist: Vec<WatchedIndex>,
    /// Key of the growth-style proxy in the relative strength pair.
    pub growth_proxy: String,
    /// Key of the broad-market proxy in the relative strength pair.
    pub broad_proxy: String,
    /// Board whose trend and sentiment feed the commentary.
    pub representative: String,
    pub indicators: IndicatorParams,
    /// Bars requested per index. Must cover the EMA span to warm up properly.
    pub history_lookback_days: usize,
    pub margin_window_days: u32,
    pub sources: SourceConfig,
    pub commentary: CommentaryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watchlist: vec![
                WatchedIndex::new("sh", "sh000001", "上证指数"),
                WatchedIndex::new("sz", "sz399001", "深证成指"),
                WatchedIndex::new("cyb", "sz399006", "创业板指"),
            ],
            growth_proxy: "cyb".to_string(),
            broad_proxy: "sh".to_string(),
            representative: "sh".to_string(),
            indicators: IndicatorParams::default(),
            history_lookback_days: 400,
            margin_window_days: 365,
            sources: SourceConfig::default(),
            commentary: CommentaryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kline_url: String,
    pub quote_url: String,
    pub sse_margin_url: String,
    pub szse_margin_url: String,
    pub money_supply_url: String,
    /// Calendar days the Shenzhen margin feed walks back; each weekday is one request.
    pub szse_history_days: u32,
    pub timeout_secs: u64,
    /// Directory of `<code>.csv` files tried after the live provider.
    pub csv_dir: Option<PathBuf>,
    /// Append the synthetic generator as the last history strategy.
    pub synthetic_fallback: bool,
    /// Skip every network source.
    pub offline: bool,
    pub parallel: bool,
    pub realtime: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kline_url: DEFAULT_KLINE_URL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            sse_margin_url: DEFAULT_SSE_URL.to_string(),
            szse_margin_url: DEFAULT_SZSE_URL.to_string(),
            money_supply_url: DEFAULT_EASTMONEY_URL.to_string(),
            szse_history_days: DEFAULT_SZSE_HISTORY_DAYS,
            timeout_secs: 10,
            csv_dir: None,
            synthetic_fallback: false,
            offline: false,
            parallel: true,
            realtime: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentaryConfig {
    pub enabled: bool,
    pub model: String,
    /// Environment variable holding the API key. The key itself never lives in config.
    pub api_key_env: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-1.5-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::Invalid("watchlist is empty".into()));
        }

        let mut seen = std::collections::BTreeSet::new();
        for index in &self.watchlist {
            if index.key.trim().is_empty() || index.code.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "watched index needs a key and a code: {index:?}"
                )));
            }
            if !seen.insert(index.key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate watch-list key '{}'",
                    index.key
                )));
            }
        }

        for (role, key) in [
            ("growth_proxy", &self.growth_proxy),
            ("broad_proxy", &self.broad_proxy),
            ("representative", &self.representative),
        ] {
            if self.watched(key).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{role} '{key}' is not on the watch list"
                )));
            }
        }
        if self.growth_proxy == self.broad_proxy {
            return Err(ConfigError::Invalid(
                "growth_proxy and broad_proxy must differ".into(),
            ));
        }

        let p = &self.indicators;
        for (name, window) in [
            ("ema_span", p.ema_span),
            ("ma_window", p.ma_window),
            ("volatility_window", p.volatility_window),
            ("volatility_lookback", p.volatility_lookback),
            ("rs_window", p.rs_window),
        ] {
            if window == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if !(0.0..=1.0).contains(&p.contraction_quantile) {
            return Err(ConfigError::Invalid(format!(
                "contraction_quantile {} outside [0, 1]",
                p.contraction_quantile
            )));
        }
        let s = &p.sentiment;
        if !(s.extreme_panic <= s.panic && s.panic < s.overheated) {
            return Err(ConfigError::Invalid(
                "sentiment thresholds must satisfy extreme_panic <= panic < overheated".into(),
            ));
        }

        if self.history_lookback_days < p.min_history() {
            return Err(ConfigError::Invalid(format!(
                "history_lookback_days {} shorter than the {}-bar minimum",
                self.history_lookback_days,
                p.min_history()
            )));
        }
        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }

        Ok(())
    }

    pub fn watched(&self, key: &str) -> Option<&WatchedIndex> {
        self.watchlist.iter().find(|w| w.key == key)
    }

    /// Canonical JSON digest of the configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
