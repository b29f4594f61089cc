//! Monthly money supply growth (M1/M2 year over year).
//!
//! The provider's month labels come in several shapes (`2024.12`,
//! `2024年12月份`, ISO dates). When none of them parse, the provider's own
//! row order is trusted and the first row is taken as the latest. Scissors
//! is always recomputed from M1 and M2.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;

use super::circuit_breaker::CircuitBreaker;
use super::http::HttpFetcher;
use super::provider::{coerce_number, DataError, MoneySupplyRow, MoneySupplySource};
use crate::domain::{MoneySupplyPoint, MoneySupplySnapshot};
use crate::time;

pub const DEFAULT_EASTMONEY_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";

/// Reduce raw provider rows to the latest reading plus its ordered history.
pub fn summarize_money_supply(rows: &[MoneySupplyRow]) -> Result<MoneySupplySnapshot, DataError> {
    let first = rows.first().ok_or_else(|| DataError::Empty {
        provider: "money_supply".into(),
        what: "monthly rows".into(),
    })?;

    let mut dated: Vec<(NaiveDate, &MoneySupplyRow)> = rows
        .iter()
        .filter_map(|row| time::parse_month_label(&row.label).map(|month| (month, row)))
        .collect();

    if dated.is_empty() {
        tracing::warn!(label = %first.label, "no parseable month labels; using first row");
        return Ok(MoneySupplySnapshot::new(
            None,
            first.label.clone(),
            first.m1_yoy,
            first.m2_yoy,
            None,
        ));
    }

    dated.sort_by_key(|(month, _)| *month);
    dated.dedup_by_key(|(month, _)| *month);

    let history: Vec<MoneySupplyPoint> = dated
        .iter()
        .map(|(month, row)| MoneySupplyPoint::new(*month, row.m1_yoy, row.m2_yoy))
        .collect();

    let (month, latest) = dated[dated.len() - 1];
    Ok(MoneySupplySnapshot::new(
        Some(month),
        month.format("%Y-%m").to_string(),
        latest.m1_yoy,
        latest.m2_yoy,
        Some(history),
    ))
}

/// Fetch and summarize; failures degrade to an unavailable snapshot.
pub fn fetch_money_supply_snapshot(source: &dyn MoneySupplySource) -> MoneySupplySnapshot {
    match source.fetch_rows().and_then(|rows| summarize_money_supply(&rows)) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(source = source.name(), error = %e, "money supply unavailable");
            MoneySupplySnapshot::unavailable(e.to_string())
        }
    }
}

/// Eastmoney macro data center, `RPT_ECONOMY_CURRENCY_SUPPLY` report.
pub struct EastmoneyMoneySupply {
    http: HttpFetcher,
    url: String,
}

impl EastmoneyMoneySupply {
    pub fn new(timeout: Duration, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new("eastmoney", timeout, circuit_breaker)?,
            url: DEFAULT_EASTMONEY_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// `{"result": {"data": [{"TIME": "2024年12月份", "CURRENCY_SAME": 1.2,
/// "BASIC_CURRENCY_SAME": 7.3}, ...]}}`. CURRENCY is M1, BASIC_CURRENCY is M2.
pub fn parse_eastmoney_payload(payload: &Value) -> Result<Vec<MoneySupplyRow>, DataError> {
    let rows = payload
        .pointer("/result/data")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged("eastmoney: missing result.data".into()))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(MoneySupplyRow {
                label: row.get("TIME")?.as_str()?.trim().to_string(),
                m1_yoy: coerce_number(row.get("CURRENCY_SAME")?)?,
                m2_yoy: coerce_number(row.get("BASIC_CURRENCY_SAME")?)?,
            })
        })
        .collect())
}

impl MoneySupplySource for EastmoneyMoneySupply {
    fn name(&self) -> &str {
        "eastmoney"
    }

    fn fetch_rows(&self) -> Result<Vec<MoneySupplyRow>, DataError> {
        let query = [
            ("reportName", "RPT_ECONOMY_CURRENCY_SUPPLY".to_string()),
            (
                "columns",
                "REPORT_DATE,TIME,CURRENCY_SAME,BASIC_CURRENCY_SAME".to_string(),
            ),
            ("pageNumber", "1".to_string()),
            ("pageSize", "2000".to_string()),
            ("sortColumns", "REPORT_DATE".to_string()),
            ("sortTypes", "-1".to_string()),
            ("source", "WEB".to_string()),
            ("client", "WEB".to_string()),
        ];
        let payload = self.http.get_json(&self.url, &query, None)?;
        let rows = parse_eastmoney_payload(&payload)?;
        tracing::debug!(rows = rows.len(), "eastmoney money supply");
        Ok(rows)
    }
}
