use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::service::earnings::{NextQuarterRevenueBasis, ReconcileOptions};
use crate::service::finance::finnhub::FINNHUB_BASE_URL;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Provider and reconciliation settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub finnhub_api_key: String,
    pub finnhub_base_url: String,
    pub http_timeout: Duration,
    pub proxy: Option<String>,
    pub reconcile: ReconcileOptions,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let finnhub_api_key = get("FINNHUB_API_KEY").ok_or(ConfigError::Missing("FINNHUB_API_KEY"))?;
        let finnhub_base_url =
            get("FINNHUB_BASE_URL").unwrap_or_else(|| FINNHUB_BASE_URL.to_string());

        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut reconcile = ReconcileOptions::default();
        if let Some(raw) = get("SURPRISE_PCT_DECIMALS") {
            reconcile.pct_decimals = match raw.trim().to_ascii_lowercase().as_str() {
                "none" | "off" => None,
                digits => Some(digits.parse::<u32>().map_err(|e| ConfigError::Invalid {
                    name: "SURPRISE_PCT_DECIMALS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?),
            };
        }
        if let Some(raw) = get("NEXT_QTR_REVENUE_BASIS") {
            reconcile.next_quarter_revenue =
                raw.parse::<NextQuarterRevenueBasis>()
                    .map_err(|reason| ConfigError::Invalid {
                        name: "NEXT_QTR_REVENUE_BASIS",
                        value: raw.clone(),
                        reason,
                    })?;
        }

        Ok(Self {
            finnhub_api_key,
            finnhub_base_url,
            http_timeout: Duration::from_secs(timeout_secs),
            proxy: get("HTTPS_PROXY"),
            reconcile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            settings(&[]),
            Err(ConfigError::Missing("FINNHUB_API_KEY"))
        ));
    }

    #[test]
    fn applies_defaults() {
        let s = settings(&[("FINNHUB_API_KEY", "abc")]).unwrap();
        assert_eq!(s.finnhub_base_url, FINNHUB_BASE_URL);
        assert_eq!(s.http_timeout, Duration::from_secs(15));
        assert_eq!(s.reconcile, ReconcileOptions::default());
        assert!(s.proxy.is_none());
    }

    #[test]
    fn reads_reconcile_overrides() {
        let s = settings(&[
            ("FINNHUB_API_KEY", "abc"),
            ("SURPRISE_PCT_DECIMALS", "none"),
            ("NEXT_QTR_REVENUE_BASIS", "chain"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(s.reconcile.pct_decimals, None);
        assert_eq!(
            s.reconcile.next_quarter_revenue,
            NextQuarterRevenueBasis::PerShareChain
        );
        assert_eq!(s.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = settings(&[("FINNHUB_API_KEY", "abc"), ("SURPRISE_PCT_DECIMALS", "two")])
            .unwrap_err();
        assert!(err.to_string().contains("SURPRISE_PCT_DECIMALS"));
    }
}
