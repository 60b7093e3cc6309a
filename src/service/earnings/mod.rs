use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{
    CompanyProfile, EstimateBasis, FinancialSnapshot, FiscalPeriod, Frequency, Metric,
    RevenueSource, SharesSource, Symbol, Unknown,
};
use crate::service::finance::FinanceServiceError;

pub mod coerce;
pub mod extract;

use coerce::{
    first_non_zero, first_numeric, first_positive, round_to, surprise_pct, to_billions, BILLION,
};
use extract::{primary_statement_revenue, secondary_statement_revenue};

const SHARES_KEYS: &[&str] = &["sharesOutstanding", "shareOutstanding"];
const NEXT_EPS_KEYS: &[&str] = &["nextEarningsPerShare", "epsNextQuarter", "epsEstimateNextQuarter"];
const ANNUAL_EPS_KEYS: &[&str] = &["epsInclExtraItemsAnnual", "epsInclExtraItemsTTM"];
const RECORD_REVENUE_KEYS: &[&str] = &["revenue", "revenueActual", "sales"];
const RECORD_REVENUE_ESTIMATE_KEYS: &[&str] = &["revenueEstimate", "salesEstimate"];
const REVENUE_TOTAL_KEYS: &[&str] = &["revenueTTM", "revenueAnnual"];

/// Fundamentals/earnings provider (Finnhub-shaped payloads).
#[async_trait::async_trait]
pub trait FundamentalsSource: Send + Sync {
    /// Most recent earnings records, newest first.
    async fn recent_earnings(&self, symbol: &Symbol, limit: usize)
        -> Result<Value, FinanceServiceError>;

    /// Basic financials; the figures sit under `metric`.
    async fn basic_financials(&self, symbol: &Symbol) -> Result<Value, FinanceServiceError>;

    /// Reported statements, newest first.
    async fn reported_financials(
        &self,
        symbol: &Symbol,
        frequency: Frequency,
    ) -> Result<Value, FinanceServiceError>;
}

/// Price-history/profile provider (Yahoo-shaped payloads).
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, FinanceServiceError>;

    async fn quarterly_income_statement(
        &self,
        symbol: &Symbol,
    ) -> Result<Value, FinanceServiceError>;
}

/// Which figures feed the next-quarter revenue estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NextQuarterRevenueBasis {
    /// Forward revenue-per-share forecast only.
    #[default]
    Forecast,
    /// The full per-share chain used for the current-quarter estimate.
    PerShareChain,
}

impl std::str::FromStr for NextQuarterRevenueBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forecast" => Ok(NextQuarterRevenueBasis::Forecast),
            "chain" | "per_share_chain" => Ok(NextQuarterRevenueBasis::PerShareChain),
            other => Err(format!("unknown next-quarter revenue basis '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Rounding for surprise percentages; `None` leaves them unrounded.
    pub pct_decimals: Option<u32>,
    pub next_quarter_revenue: NextQuarterRevenueBasis,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            pct_decimals: Some(2),
            next_quarter_revenue: NextQuarterRevenueBasis::default(),
        }
    }
}

/// Per-share revenue candidates in tie-break order.
const PER_SHARE_CHAIN: &[EstimateBasis] = &[
    EstimateBasis::PerShareForecast,
    EstimateBasis::PerShare,
    EstimateBasis::PerShareTtm,
    EstimateBasis::TotalsOverShares,
];

impl EstimateBasis {
    /// Revenue per share under this basis, if strictly positive.
    fn revenue_per_share(&self, metrics: &Value, shares: f64) -> Option<f64> {
        let rps = match self {
            EstimateBasis::Reported => None,
            EstimateBasis::PerShareForecast => first_numeric(metrics, &["revenuePerShareForecast"]),
            EstimateBasis::PerShare => first_numeric(metrics, &["revenuePerShare"]),
            EstimateBasis::PerShareTtm => first_numeric(metrics, &["revenuePerShareTTM"]),
            EstimateBasis::TotalsOverShares => first_non_zero(metrics, REVENUE_TOTAL_KEYS)
                .filter(|_| shares != 0.0)
                .map(|total| total / shares),
        };
        rps.filter(|v| *v > 0.0 && v.is_finite())
    }
}

/// Metric set from the fundamentals provider, or the reason it is missing.
struct MetricSet(Result<Value, Unknown>);

impl MetricSet {
    fn lookup(&self, f: impl FnOnce(&Value) -> Option<f64>) -> Metric {
        match &self.0 {
            Ok(metrics) => Metric::from_option(f(metrics)),
            Err(reason) => Metric::Unknown(reason.clone()),
        }
    }

    fn get(&self) -> Option<&Value> {
        self.0.as_ref().ok()
    }

    fn unknown(&self) -> Metric {
        match &self.0 {
            Ok(_) => Metric::not_reported(),
            Err(reason) => Metric::Unknown(reason.clone()),
        }
    }
}

/// Fields read from the latest earnings record.
struct EarningsRecord {
    eps_actual: Metric,
    eps_estimate: Metric,
    revenue_actual: Option<f64>,
    revenue_estimate: Option<f64>,
    period: Option<FiscalPeriod>,
}

impl EarningsRecord {
    fn unavailable(reason: Unknown) -> Self {
        Self {
            eps_actual: Metric::Unknown(reason.clone()),
            eps_estimate: Metric::Unknown(reason),
            revenue_actual: None,
            revenue_estimate: None,
            period: None,
        }
    }

    fn from_payload(payload: &Value) -> Self {
        let Some(record) = payload
            .as_array()
            .and_then(|list| list.first())
            .filter(|r| r.is_object())
        else {
            return Self::unavailable(Unknown::NotReported);
        };

        let period = FiscalPeriod {
            period_end: record
                .get("period")
                .and_then(|p| p.as_str())
                .and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()),
            year: record
                .get("year")
                .and_then(|v| v.as_i64())
                .and_then(|v| i32::try_from(v).ok()),
            quarter: record
                .get("quarter")
                .and_then(|v| v.as_u64())
                .and_then(|v| u8::try_from(v).ok()),
        };

        Self {
            eps_actual: Metric::from_option(first_numeric(record, &["actual"])),
            eps_estimate: Metric::from_option(first_numeric(record, &["estimate"])),
            revenue_actual: first_non_zero(record, RECORD_REVENUE_KEYS),
            revenue_estimate: first_non_zero(record, RECORD_REVENUE_ESTIMATE_KEYS),
            period: Some(period),
        }
    }
}

/// Builds [`FinancialSnapshot`]s from the two providers, degrading field by
/// field when a provider or a field is unavailable.
pub struct EarningsReconciler {
    fundamentals: Arc<dyn FundamentalsSource>,
    profiles: Arc<dyn ProfileSource>,
    options: ReconcileOptions,
}

impl EarningsReconciler {
    pub fn new(
        fundamentals: Arc<dyn FundamentalsSource>,
        profiles: Arc<dyn ProfileSource>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            fundamentals,
            profiles,
            options,
        }
    }

    /// Reconcile the latest earnings figures for `symbol`. Never fails; see
    /// [`Metric`] for how missing figures are reported.
    pub async fn reconcile(&self, symbol: &Symbol) -> FinancialSnapshot {
        info!("Reconciling earnings snapshot for {}", symbol);
        let decimals = self.options.pct_decimals;

        let record = match self.fundamentals.recent_earnings(symbol, 1).await {
            Ok(payload) => EarningsRecord::from_payload(&payload),
            Err(e) => {
                warn!("earnings record fetch failed for {}: {}", symbol, e);
                EarningsRecord::unavailable(Unknown::Upstream(e.to_string()))
            }
        };

        let metrics = match self.fundamentals.basic_financials(symbol).await {
            Ok(payload) => match payload.get("metric").filter(|m| m.is_object()) {
                Some(m) => MetricSet(Ok(m.clone())),
                None => MetricSet(Err(Unknown::NotReported)),
            },
            Err(e) => {
                warn!("basic financials fetch failed for {}: {}", symbol, e);
                MetricSet(Err(Unknown::Upstream(e.to_string())))
            }
        };

        let profile = match self.profiles.profile(symbol).await {
            Ok(p) => Ok(p),
            Err(e) => {
                warn!("profile fetch failed for {}: {}", symbol, e);
                Err(Unknown::Upstream(e.to_string()))
            }
        };

        let (shares_outstanding, shares_source) = resolve_shares(&metrics, &profile);
        let (revenue_actual_b, revenue_actual_source) =
            self.resolve_revenue_actual(symbol, &record).await;

        let (revenue_estimate_b, revenue_estimate_basis) = match record.revenue_estimate {
            Some(raw) => (Metric::known(to_billions(raw)), Some(EstimateBasis::Reported)),
            None => revenue_from_chain(&metrics, &shares_outstanding, PER_SHARE_CHAIN),
        };

        let next_quarter_eps_estimate = metrics.lookup(|m| first_non_zero(m, NEXT_EPS_KEYS));
        let next_quarter_revenue_b = match self.options.next_quarter_revenue {
            NextQuarterRevenueBasis::Forecast => revenue_from_chain(
                &metrics,
                &shares_outstanding,
                &[EstimateBasis::PerShareForecast],
            ),
            NextQuarterRevenueBasis::PerShareChain => {
                revenue_from_chain(&metrics, &shares_outstanding, PER_SHARE_CHAIN)
            }
        }
        .0;

        let annual_eps_estimate = metrics.lookup(|m| first_non_zero(m, ANNUAL_EPS_KEYS));
        let annual_revenue_b = revenue_from_chain(
            &metrics,
            &shares_outstanding,
            &[EstimateBasis::PerShareTtm],
        )
        .0
        .map(|v| round_to(v, 2));

        let eps_surprise_pct = surprise_pct(&record.eps_actual, &record.eps_estimate, decimals);
        // An unknown actual is "no data", not zero revenue.
        let revenue_surprise_pct = if revenue_actual_b.is_known() {
            surprise_pct(&revenue_actual_b, &revenue_estimate_b, decimals)
        } else {
            0.0
        };
        let next_quarter_revenue_surprise_pct = if revenue_actual_b.non_zero().is_some() {
            surprise_pct(&next_quarter_revenue_b, &revenue_actual_b, decimals)
        } else {
            0.0
        };

        debug!(
            "{}: eps {:?}/{:?}, revenue {:?} ({:?}) vs {:?} ({:?})",
            symbol,
            record.eps_actual,
            record.eps_estimate,
            revenue_actual_b,
            revenue_actual_source,
            revenue_estimate_b,
            revenue_estimate_basis
        );

        FinancialSnapshot {
            ticker: symbol.clone(),
            fetched_at: Utc::now(),
            period: record.period,
            profile: profile.ok(),
            eps_actual: record.eps_actual,
            eps_estimate: record.eps_estimate,
            eps_surprise_pct,
            revenue_actual_b,
            revenue_actual_source,
            revenue_estimate_b,
            revenue_estimate_basis,
            revenue_surprise_pct,
            shares_outstanding,
            shares_source,
            next_quarter_eps_estimate,
            next_quarter_revenue_b,
            next_quarter_revenue_surprise_pct,
            annual_eps_estimate,
            annual_revenue_b,
        }
    }

    /// Earnings record, then the primary statement, then the secondary one.
    /// Zero counts as missing at every step.
    async fn resolve_revenue_actual(
        &self,
        symbol: &Symbol,
        record: &EarningsRecord,
    ) -> (Metric, Option<RevenueSource>) {
        if let Some(raw) = record.revenue_actual {
            return (
                Metric::known(to_billions(raw)),
                Some(RevenueSource::EarningsRecord),
            );
        }

        let mut first_failure: Option<Unknown> = None;

        match self
            .fundamentals
            .reported_financials(symbol, Frequency::Quarterly)
            .await
        {
            Ok(payload) => {
                if let Some(raw) = primary_statement_revenue(&payload).filter(|v| *v != 0.0) {
                    return (
                        Metric::known(to_billions(raw)),
                        Some(RevenueSource::PrimaryStatement),
                    );
                }
                debug!("no usable revenue in reported financials for {}", symbol);
            }
            Err(e) => {
                warn!("reported financials fetch failed for {}: {}", symbol, e);
                first_failure = Some(Unknown::Upstream(e.to_string()));
            }
        }

        match self.profiles.quarterly_income_statement(symbol).await {
            Ok(data) => {
                if let Some(raw) = secondary_statement_revenue(&data).filter(|v| *v != 0.0) {
                    info!("{}: revenue actual taken from secondary statement", symbol);
                    return (
                        Metric::known(to_billions(raw)),
                        Some(RevenueSource::SecondaryStatement),
                    );
                }
            }
            Err(e) => {
                warn!("quarterly statement fetch failed for {}: {}", symbol, e);
                if first_failure.is_none() {
                    first_failure = Some(Unknown::Upstream(e.to_string()));
                }
            }
        }

        (
            Metric::Unknown(first_failure.unwrap_or(Unknown::NotReported)),
            None,
        )
    }
}

/// Shares from the metric set, then from the profile. Only positive counts
/// are accepted.
fn resolve_shares(
    metrics: &MetricSet,
    profile: &Result<CompanyProfile, Unknown>,
) -> (Metric, Option<SharesSource>) {
    if let Some(shares) = metrics
        .get()
        .and_then(|m| first_positive(m, SHARES_KEYS))
    {
        return (Metric::known(shares), Some(SharesSource::Fundamentals));
    }
    match profile {
        Ok(p) => match p.shares_outstanding.filter(|v| *v > 0.0) {
            Some(shares) => (Metric::known(shares), Some(SharesSource::Profile)),
            None => (metrics.unknown(), None),
        },
        Err(reason) => match metrics.unknown() {
            Metric::Unknown(Unknown::NotReported) => (Metric::Unknown(reason.clone()), None),
            other => (other, None),
        },
    }
}

/// `revenue per share × shares / 1e9` over `chain`; first positive candidate
/// wins.
fn revenue_from_chain(
    metrics: &MetricSet,
    shares: &Metric,
    chain: &[EstimateBasis],
) -> (Metric, Option<EstimateBasis>) {
    let Some(metric_values) = metrics.get() else {
        return (metrics.unknown(), None);
    };
    let Some(shares) = shares.non_zero() else {
        return (shares.clone(), None);
    };
    for basis in chain {
        if let Some(rps) = basis.revenue_per_share(metric_values, shares) {
            return (Metric::known(rps * shares / BILLION), Some(*basis));
        }
    }
    (Metric::not_reported(), None)
}
