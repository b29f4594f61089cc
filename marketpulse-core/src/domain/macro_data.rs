//! Liquidity snapshot: margin financing balances and money supply growth.
//!
//! Unknown figures are `None`. A zero balance is a real zero.

use chrono::NaiveDate;
use serde::Serialize;

/// Margin balance on one trading day, per exchange and combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginPoint {
    date: NaiveDate,
    exchange_a: f64,
    exchange_b: f64,
    total: f64,
}

impl MarginPoint {
    pub fn new(date: NaiveDate, exchange_a: f64, exchange_b: f64) -> Self {
        Self {
            date,
            exchange_a,
            exchange_b,
            total: exchange_a + exchange_b,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn exchange_a(&self) -> f64 {
        self.exchange_a
    }

    pub fn exchange_b(&self) -> f64 {
        self.exchange_b
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}

/// Which strategy produced the margin figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginProvenance {
    JoinedHistory,
    SinglePoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginSnapshot {
    pub as_of: Option<NaiveDate>,
    pub exchange_a: Option<f64>,
    pub exchange_b: Option<f64>,
    pub total: Option<f64>,
    pub history: Option<Vec<MarginPoint>>,
    pub provenance: Option<MarginProvenance>,
    pub error: Option<String>,
}

impl MarginSnapshot {
    /// Snapshot from the latest reconciled point.
    pub fn from_latest(
        latest: MarginPoint,
        history: Option<Vec<MarginPoint>>,
        provenance: MarginProvenance,
    ) -> Self {
        Self {
            as_of: Some(latest.date),
            exchange_a: Some(latest.exchange_a),
            exchange_b: Some(latest.exchange_b),
            total: Some(latest.total),
            history,
            provenance: Some(provenance),
            error: None,
        }
    }

    /// Degraded snapshot: every figure unknown, with the reason.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            as_of: None,
            exchange_a: None,
            exchange_b: None,
            total: None,
            history: None,
            provenance: None,
            error: Some(error.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.total.is_some()
    }
}

/// One month of M1/M2 growth. Scissors is derived at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoneySupplyPoint {
    month: NaiveDate,
    m1_yoy: f64,
    m2_yoy: f64,
    scissors: f64,
}

impl MoneySupplyPoint {
    pub fn new(month: NaiveDate, m1_yoy: f64, m2_yoy: f64) -> Self {
        Self {
            month,
            m1_yoy,
            m2_yoy,
            scissors: m1_yoy - m2_yoy,
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn m1_yoy(&self) -> f64 {
        self.m1_yoy
    }

    pub fn m2_yoy(&self) -> f64 {
        self.m2_yoy
    }

    pub fn scissors(&self) -> f64 {
        self.scissors
    }
}

/// Latest money supply reading.
///
/// `month` is `None` when the provider's month labels could not be parsed;
/// `month_label` then keeps the raw label of the row that was used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneySupplySnapshot {
    month: Option<NaiveDate>,
    month_label: Option<String>,
    m1_yoy: Option<f64>,
    m2_yoy: Option<f64>,
    scissors: Option<f64>,
    history: Option<Vec<MoneySupplyPoint>>,
    error: Option<String>,
}

impl MoneySupplySnapshot {
    pub fn new(
        month: Option<NaiveDate>,
        month_label: impl Into<String>,
        m1_yoy: f64,
        m2_yoy: f64,
        history: Option<Vec<MoneySupplyPoint>>,
    ) -> Self {
        Self {
            month,
            month_label: Some(month_label.into()),
            m1_yoy: Some(m1_yoy),
            m2_yoy: Some(m2_yoy),
            scissors: Some(m1_yoy - m2_yoy),
            history,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            month: None,
            month_label: None,
            m1_yoy: None,
            m2_yoy: None,
            scissors: None,
            history: None,
            error: Some(error.into()),
        }
    }

    pub fn month(&self) -> Option<NaiveDate> {
        self.month
    }

    pub fn month_label(&self) -> Option<&str> {
        self.month_label.as_deref()
    }

    pub fn m1_yoy(&self) -> Option<f64> {
        self.m1_yoy
    }

    pub fn m2_yoy(&self) -> Option<f64> {
        self.m2_yoy
    }

    pub fn scissors(&self) -> Option<f64> {
        self.scissors
    }

    pub fn history(&self) -> Option<&[MoneySupplyPoint]> {
        self.history.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.scissors.is_some()
    }
}

/// Both liquidity readings, fetched once per analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSnapshot {
    pub as_of_date: Option<NaiveDate>,
    pub margin: MarginSnapshot,
    pub money_supply: MoneySupplySnapshot,
}

impl MacroSnapshot {
    /// The margin date wins; the money supply month is used only when margin
    /// data is missing.
    pub fn new(margin: MarginSnapshot, money_supply: MoneySupplySnapshot) -> Self {
        let as_of_date = margin.as_of.or(money_supply.month());
        Self {
            as_of_date,
            margin,
            money_supply,
        }
    }

    pub fn margin_balance(&self) -> Option<f64> {
        self.margin.total
    }

    pub fn scissors(&self) -> Option<f64> {
        self.money_supply.scissors()
    }
}
