//! Ordered fallback chains.
//!
//! A chain is a list of named strategies tried in order; the first success
//! wins and every attempt (including the failed ones) is recorded so callers
//! can report which source actually answered.

use serde::Serialize;

use super::provider::{DataError, HistorySource};
use crate::domain::IndexSeries;

/// One strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub strategy: String,
    /// `None` when the strategy succeeded.
    pub error: Option<String>,
}

/// Successful chain result.
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    pub value: T,
    pub strategy: String,
    pub attempts: Vec<Attempt>,
}

type Strategy<'a, T> = Box<dyn Fn() -> Result<T, DataError> + 'a>;

pub struct FallbackChain<'a, T> {
    label: String,
    strategies: Vec<(String, Strategy<'a, T>)>,
}

impl<'a, T> FallbackChain<'a, T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            strategies: Vec::new(),
        }
    }

    pub fn then(
        mut self,
        name: impl Into<String>,
        strategy: impl Fn() -> Result<T, DataError> + 'a,
    ) -> Self {
        self.strategies.push((name.into(), Box::new(strategy)));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn run(self) -> Result<FallbackOutcome<T>, DataError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for (name, strategy) in self.strategies {
            match strategy() {
                Ok(value) => {
                    tracing::debug!(chain = %self.label, strategy = %name, "strategy succeeded");
                    attempts.push(Attempt {
                        strategy: name.clone(),
                        error: None,
                    });
                    return Ok(FallbackOutcome {
                        value,
                        strategy: name,
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::warn!(chain = %self.label, strategy = %name, error = %e, "strategy failed");
                    attempts.push(Attempt {
                        strategy: name,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let summary = if attempts.is_empty() {
            "no strategies configured".to_string()
        } else {
            attempts
                .iter()
                .map(|a| format!("{}: {}", a.strategy, a.error.as_deref().unwrap_or("ok")))
                .collect::<Vec<_>>()
                .join("; ")
        };

        Err(DataError::Exhausted {
            chain: self.label,
            attempts: summary,
        })
    }
}

/// History sources tried in order for each code.
pub struct FallbackHistory {
    sources: Vec<Box<dyn HistorySource>>,
}

impl FallbackHistory {
    pub fn new(sources: Vec<Box<dyn HistorySource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Like [`HistorySource::fetch_history`] but keeps the attempt log.
    pub fn fetch_with_attempts(
        &self,
        code: &str,
        lookback_days: usize,
    ) -> Result<FallbackOutcome<IndexSeries>, DataError> {
        self.sources
            .iter()
            .fold(FallbackChain::new(format!("history:{code}")), |chain, source| {
                chain.then(source.name(), move || {
                    if !source.is_available() {
                        return Err(DataError::CircuitBreakerTripped);
                    }
                    let series = source.fetch_history(code, lookback_days)?;
                    if series.is_empty() {
                        return Err(DataError::Empty {
                            provider: source.name().to_string(),
                            what: code.to_string(),
                        });
                    }
                    Ok(series)
                })
            })
            .run()
    }
}

impl HistorySource for FallbackHistory {
    fn name(&self) -> &str {
        "fallback"
    }

    fn fetch_history(&self, code: &str, lookback_days: usize) -> Result<IndexSeries, DataError> {
        self.fetch_with_attempts(code, lookback_days)
            .map(|outcome| outcome.value)
    }

    fn is_available(&self) -> bool {
        self.sources.iter().any(|s| s.is_available())
    }
}
