use std::time::Duration as StdDuration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Frequency, Symbol};
use crate::service::earnings::FundamentalsSource;
use crate::service::finance::FinanceServiceError;

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Fundamentals/earnings provider backed by the Finnhub REST API.
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, FinanceServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FinanceServiceError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FinanceServiceError> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .header("X-Finnhub-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                warn!("Finnhub request to {} failed: {}", path, e);
                FinanceServiceError::Http(format!("{path} request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unable to read body".to_string());
            warn!("Finnhub {} returned error status {}: {}", path, status, body);
            return Err(FinanceServiceError::Http(format!(
                "{path} status {status}: {body}"
            )));
        }

        let raw_bytes = resp.bytes().await.map_err(|e| {
            warn!("Failed to read Finnhub {} body: {}", path, e);
            FinanceServiceError::Http(format!("{path} body read failed: {e}"))
        })?;

        serde_json::from_slice(&raw_bytes).map_err(|e| {
            let preview = String::from_utf8_lossy(&raw_bytes[..raw_bytes.len().min(500)]);
            warn!(
                "Failed to parse Finnhub {} response: {}; body preview: {}",
                path, e, preview
            );
            FinanceServiceError::Http(format!("{path} parse failed: {e}"))
        })
    }
}

#[async_trait::async_trait]
impl FundamentalsSource for FinnhubClient {
    async fn recent_earnings(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Value, FinanceServiceError> {
        let limit = limit.max(1).to_string();
        self.get_json(
            "stock/earnings",
            &[("symbol", symbol.as_str()), ("limit", limit.as_str())],
        )
        .await
    }

    async fn basic_financials(&self, symbol: &Symbol) -> Result<Value, FinanceServiceError> {
        self.get_json("stock/metric", &[("symbol", symbol.as_str()), ("metric", "all")])
            .await
    }

    async fn reported_financials(
        &self,
        symbol: &Symbol,
        frequency: Frequency,
    ) -> Result<Value, FinanceServiceError> {
        self.get_json(
            "stock/financials-reported",
            &[("symbol", symbol.as_str()), ("freq", frequency.as_str())],
        )
        .await
    }
}
