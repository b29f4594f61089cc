//! Blocking HTTP plumbing shared by the network adapters.
//!
//! One GET per call: status mapping and the circuit breaker live here so the
//! adapters only deal with payload parsing.

use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    provider: String,
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpFetcher {
    pub fn new(
        provider: impl Into<String>,
        timeout: Duration,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider: provider.into(),
            client,
            circuit_breaker,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    fn send(
        &self,
        url: &str,
        query: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<reqwest::blocking::Response, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut request = self.client.get(url).query(query);
        if let Some(referer) = referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        tracing::debug!(provider = %self.provider, url, "GET");
        let resp = request.send().map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::NetworkUnreachable(format!("{}: {e}", self.provider))
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} from {}", self.provider)));
        }

        self.circuit_breaker.record_success();
        Ok(resp)
    }

    pub fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<String, DataError> {
        self.send(url, query, referer)?.text().map_err(|e| {
            DataError::ResponseFormatChanged(format!("{}: unreadable body: {e}", self.provider))
        })
    }

    pub fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<serde_json::Value, DataError> {
        let body = self.get_text(url, query, referer)?;
        serde_json::from_str(strip_jsonp(&body)).map_err(|e| {
            DataError::ResponseFormatChanged(format!("{}: invalid JSON: {e}", self.provider))
        })
    }
}

/// Some endpoints wrap JSON in a `callback(...)` call.
fn strip_jsonp(body: &str) -> &str {
    let trimmed = body.trim().trim_end_matches(';');
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open < close => &trimmed[open + 1..close],
        _ => trimmed,
    }
}
