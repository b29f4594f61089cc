//! Natural-language commentary over the cycle's headline figures.
//!
//! The engine hands a [`Commentator`] a flat string map and embeds whatever
//! comes back. One attempt per cycle; any failure becomes a placeholder.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};

use marketpulse_core::domain::{BoardSignal, MacroSnapshot};

use crate::config::CommentaryConfig;

/// Value used for any figure that is not available.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum CommentaryError {
    #[error("API key not configured (set {0})")]
    MissingApiKey(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

pub trait Commentator: Send + Sync {
    fn summarize(&self, context: &BTreeMap<String, String>) -> Result<String, CommentaryError>;
}

/// Placeholder embedded in the snapshot when commentary fails.
pub fn placeholder(error: &CommentaryError) -> String {
    format!("Commentary unavailable: {error}")
}

/// Flatten the cycle's headline figures for the commentator.
///
/// Keys: `margin_balance`, `m1_m2_scissors`, `sentiment_status`,
/// `trend_status`, `nhr`. Breadth is not computed, so `nhr` is always `N/A`.
pub fn build_commentary_input(
    macro_data: &MacroSnapshot,
    representative: Option<&BoardSignal>,
) -> BTreeMap<String, String> {
    let margin_balance = macro_data
        .margin_balance()
        .map(|total| format!("{:.2} billion CNY", total / 1e9))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let scissors = macro_data
        .scissors()
        .map(|s| format!("{s:.2}%"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let sentiment = representative
        .map(|b| {
            format!(
                "{} (bias {:.2}%)",
                b.sentiment.status.label(),
                b.sentiment.score
            )
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let trend = representative
        .map(|b| {
            let side = if b.trend.current_price > b.trend.ema {
                "above"
            } else {
                "below"
            };
            format!("{} ({side} EMA{})", b.trend.status.label(), b.trend.span)
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    BTreeMap::from([
        ("margin_balance".to_string(), margin_balance),
        ("m1_m2_scissors".to_string(), scissors),
        ("sentiment_status".to_string(), sentiment),
        ("trend_status".to_string(), trend),
        ("nhr".to_string(), NOT_AVAILABLE.to_string()),
    ])
}

/// Render the prompt sent to a language model.
pub fn render_prompt(context: &BTreeMap<String, String>) -> String {
    let get = |key: &str| context.get(key).map(String::as_str).unwrap_or(NOT_AVAILABLE);
    format!(
        "You are a macro-quantitative trader. Assess whether the China A-share market \
         is safe to trade right now, using only the figures below.\n\
         \n\
         Liquidity\n\
         - Margin financing balance: {margin}\n\
         - M1-M2 growth scissors: {scissors}\n\
         A rising margin balance means retail money is flowing in. A widening \
         negative scissors points to a liquidity trap.\n\
         \n\
         Sentiment\n\
         - Bias versus the 20-day average: {sentiment}\n\
         - New high / new low ratio: {nhr}\n\
         \n\
         Trend\n\
         - Index versus its long EMA: {trend}\n\
         Below the EMA is a bear regime, above it a bull regime.\n\
         \n\
         Answer with:\n\
         - Verdict: one of Safe to trade / Wait and see / Oversold opportunity\n\
         - Analysis: two or three sentences grounded in the figures\n\
         - Risk: the single largest current risk in one sentence",
        margin = get("margin_balance"),
        scissors = get("m1_m2_scissors"),
        sentiment = get("sentiment_status"),
        nhr = get("nhr"),
        trend = get("trend_status"),
    )
}

/// Gemini `generateContent` over blocking HTTP.
pub struct GeminiCommentator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiCommentator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CommentaryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CommentaryError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Reads the API key from the configured environment variable.
    pub fn from_config(config: &CommentaryConfig) -> Result<Self, CommentaryError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CommentaryError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            &config.endpoint,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// First candidate's concatenated text parts.
pub fn parse_gemini_response(payload: &Value) -> Result<String, CommentaryError> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            CommentaryError::Response(reason.to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(CommentaryError::Response("empty text".into()));
    }
    Ok(text)
}

impl Commentator for GeminiCommentator {
    fn summarize(&self, context: &BTreeMap<String, String>) -> Result<String, CommentaryError> {
        let url = format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": render_prompt(context)}]}]
        });

        tracing::debug!(model = %self.model, "requesting commentary");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| CommentaryError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .map_err(|e| CommentaryError::Response(e.without_url().to_string()))?;
        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no error message");
            return Err(CommentaryError::Request(format!("HTTP {status}: {message}")));
        }
        parse_gemini_response(&payload)
    }
}
