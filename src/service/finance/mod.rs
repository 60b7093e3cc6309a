use std::sync::Arc;
use std::time::Duration as StdDuration;

use finance_query_core::{FetchClient, YahooAuthManager, YahooError, YahooFinanceClient};
use serde_json::Value;
use tracing::info;

use crate::models::{ChartSeries, CompanyProfile, HistoryPeriod, PriceBar, Symbol};
use crate::service::earnings::ProfileSource;

pub mod finnhub;
pub mod fundamentals;
pub mod history;

#[derive(Debug, thiserror::Error)]
pub enum FinanceServiceError {
    #[error(transparent)]
    Yahoo(#[from] YahooError),
    #[error("No data for symbol {0}")]
    NotFound(String),
    #[error("Provider HTTP error: {0}")]
    Http(String),
}

/// Price-history and company-profile provider backed by Yahoo Finance.
pub struct FinanceService {
    client: Arc<YahooFinanceClient>,
    #[allow(dead_code)]
    auth: Arc<YahooAuthManager>,
    #[allow(dead_code)]
    fetch: Arc<FetchClient>,
    http: reqwest::Client,
    chart_base_url: String,
}

impl FinanceService {
    /// Build a finance service with optional proxy support.
    pub fn new(proxy: Option<String>, timeout: StdDuration) -> Result<Self, FinanceServiceError> {
        let fetch = Arc::new(FetchClient::new(proxy.clone())?);
        let auth = Arc::new(YahooAuthManager::new(proxy, fetch.cookie_jar().clone()));
        let client = Arc::new(YahooFinanceClient::new(auth.clone(), fetch.clone()));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FinanceServiceError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            auth,
            fetch,
            http,
            chart_base_url: history::CHART_BASE_URL.to_string(),
        })
    }

    /// Fetch the company header: name, market cap, valuation ratios, shares.
    pub async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, FinanceServiceError> {
        let summary = self
            .client
            .get_quote_summary(
                symbol,
                &["price", "summaryDetail", "defaultKeyStatistics"],
            )
            .await?;

        parse_profile(symbol, &summary)
            .ok_or_else(|| FinanceServiceError::NotFound(symbol.to_string()))
    }

    /// Fetch the quarterly income-statement revenue timeseries.
    pub async fn get_quarterly_income_statement(
        &self,
        symbol: &str,
    ) -> Result<Value, FinanceServiceError> {
        let data = fundamentals::fetch_quarterly_revenue_timeseries(
            self.client.as_ref(),
            symbol,
            fundamentals::FETCH_YEARS_DEFAULT,
        )
        .await?;

        Ok(data)
    }

    /// Fetch daily OHLC bars for a symbol.
    pub async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<PriceBar>, FinanceServiceError> {
        let bars = history::fetch_history(&self.http, &self.chart_base_url, symbol, period).await?;
        if bars.is_empty() {
            return Err(FinanceServiceError::NotFound(symbol.to_string()));
        }
        info!("Fetched {} {} bars for {}", bars.len(), period, symbol);
        Ok(bars)
    }

    /// Bars plus the SMA overlays of the price chart.
    pub async fn get_chart_series(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<ChartSeries, FinanceServiceError> {
        let bars = self.get_history(symbol, period).await?;
        Ok(build_chart_series(symbol, period, bars))
    }
}

pub fn build_chart_series(symbol: &str, period: HistoryPeriod, bars: Vec<PriceBar>) -> ChartSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let overlays = history::SMA_WINDOWS
        .iter()
        .map(|w| history::simple_moving_average(&closes, *w))
        .collect();

    ChartSeries {
        symbol: symbol.to_uppercase(),
        period,
        bars,
        overlays,
    }
}

#[async_trait::async_trait]
impl ProfileSource for FinanceService {
    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, FinanceServiceError> {
        self.get_profile(symbol.as_str()).await
    }

    async fn quarterly_income_statement(
        &self,
        symbol: &Symbol,
    ) -> Result<Value, FinanceServiceError> {
        self.get_quarterly_income_statement(symbol.as_str()).await
    }
}

/// Map a quote-summary response onto the profile header.
pub fn parse_profile(symbol: &str, summary: &Value) -> Option<CompanyProfile> {
    let result = summary
        .get("quoteSummary")
        .and_then(|q| q.get("result"))
        .and_then(|r| r.as_array())
        .and_then(|arr| arr.first())?;

    let short_name = result
        .get("price")
        .and_then(|p| p.get("shortName").or_else(|| p.get("longName")))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());

    Some(CompanyProfile {
        symbol: symbol.to_uppercase(),
        short_name,
        market_cap: extract_f64_raw(result, &["price", "marketCap"])
            .or_else(|| extract_f64_raw(result, &["summaryDetail", "marketCap"])),
        trailing_pe: extract_f64_raw(result, &["summaryDetail", "trailingPE"]),
        forward_pe: extract_f64_raw(result, &["summaryDetail", "forwardPE"])
            .or_else(|| extract_f64_raw(result, &["defaultKeyStatistics", "forwardPE"])),
        peg_ratio: extract_f64_raw(result, &["defaultKeyStatistics", "pegRatio"]),
        shares_outstanding: extract_f64_raw(result, &["defaultKeyStatistics", "sharesOutstanding"]),
    })
}

fn extract_f64_raw(root: &Value, path: &[&str]) -> Option<f64> {
    let mut current = root;
    for key in path {
        current = current.get(*key)?;
    }

    current
        .get("raw")
        .and_then(|v| v.as_f64())
        .or_else(|| current.as_f64())
}
