use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Metric, Symbol};

/// Where the current-quarter revenue actual came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    /// Reported alongside EPS in the latest earnings record.
    EarningsRecord,
    /// Fundamentals provider's quarterly reported income statement.
    PrimaryStatement,
    /// Profile provider's quarterly income statement (fallback).
    SecondaryStatement,
}

/// How a revenue estimate was obtained, in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateBasis {
    Reported,
    PerShareForecast,
    PerShare,
    PerShareTtm,
    TotalsOverShares,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharesSource {
    Fundamentals,
    Profile,
}

/// Fiscal period of the latest earnings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
}

impl FiscalPeriod {
    /// "Q2 2026" style label when both parts are known.
    pub fn label(&self) -> Option<String> {
        match (self.quarter, self.year) {
            (Some(q), Some(y)) => Some(format!("Q{q} {y}")),
            _ => None,
        }
    }
}

/// Company header data from the price-history/profile provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peg_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<f64>,
}

/// Reconciled earnings figures for one ticker, rebuilt on every call.
///
/// Revenue figures are in billions. Percentages are always finite; a zero or
/// unknown denominator yields `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub ticker: Symbol,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<FiscalPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CompanyProfile>,

    pub eps_actual: Metric,
    pub eps_estimate: Metric,
    pub eps_surprise_pct: f64,

    pub revenue_actual_b: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_actual_source: Option<RevenueSource>,
    pub revenue_estimate_b: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_estimate_basis: Option<EstimateBasis>,
    pub revenue_surprise_pct: f64,

    pub shares_outstanding: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_source: Option<SharesSource>,

    pub next_quarter_eps_estimate: Metric,
    pub next_quarter_revenue_b: Metric,
    pub next_quarter_revenue_surprise_pct: f64,

    pub annual_eps_estimate: Metric,
    pub annual_revenue_b: Metric,
}

impl FinancialSnapshot {
    /// True when the revenue actual only came from the secondary provider.
    pub fn revenue_fallback_used(&self) -> bool {
        self.revenue_actual_source == Some(RevenueSource::SecondaryStatement)
    }

    /// Compares everything except `fetched_at`.
    pub fn same_figures(&self, other: &FinancialSnapshot) -> bool {
        let mut other = other.clone();
        other.fetched_at = self.fetched_at;
        *self == other
    }
}
