use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{HistoryPeriod, MovingAverage, PriceBar};
use crate::service::finance::FinanceServiceError;

pub const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Windows of the moving averages drawn over the price chart.
pub const SMA_WINDOWS: [usize; 3] = [20, 50, 200];

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo uses hyphens for share classes (BRK-B, not BRK.B).
fn chart_symbol(symbol: &str) -> String {
    symbol.to_uppercase().replace('.', "-")
}

/// Fetch daily bars for `symbol` over `period`.
pub async fn fetch_history(
    http: &reqwest::Client,
    base_url: &str,
    symbol: &str,
    period: HistoryPeriod,
) -> Result<Vec<PriceBar>, FinanceServiceError> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), chart_symbol(symbol));
    debug!("Fetching {} history for {} from {}", period, symbol, url);

    let resp = http
        .get(&url)
        .query(&[
            ("range", period.as_str()),
            ("interval", "1d"),
            ("includePrePost", "false"),
        ])
        .send()
        .await
        .map_err(|e| FinanceServiceError::Http(format!("history request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        warn!("Chart API returned status {} for {}", status, symbol);
        return Err(FinanceServiceError::Http(format!("chart api status {status}")));
    }

    let raw = resp
        .bytes()
        .await
        .map_err(|e| FinanceServiceError::Http(format!("history body read failed: {e}")))?;

    parse_chart(&raw, symbol)
}

/// Decode a chart payload into bars, skipping rows without a positive close.
pub fn parse_chart(raw: &[u8], symbol: &str) -> Result<Vec<PriceBar>, FinanceServiceError> {
    let parsed: ChartResponse = serde_json::from_slice(raw)
        .map_err(|e| FinanceServiceError::Http(format!("chart parse failed: {e}")))?;

    if let Some(err) = parsed.chart.error {
        return Err(FinanceServiceError::Http(format!(
            "chart api error: {} - {}",
            err.code, err.description
        )));
    }

    let result = parsed
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FinanceServiceError::NotFound(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten().filter(|c| *c > 0.0) else {
            continue;
        };
        let Some(timestamp) = DateTime::<Utc>::from_timestamp(*ts, 0) else {
            continue;
        };
        let open = quote.open.get(i).copied().flatten().unwrap_or(close);
        bars.push(PriceBar {
            timestamp,
            open,
            high: quote.high.get(i).copied().flatten().unwrap_or(open.max(close)),
            low: quote.low.get(i).copied().flatten().unwrap_or(open.min(close)),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }

    Ok(bars)
}

/// Mean of each full `window` of closes, summed afresh so long ranges do not
/// accumulate rounding drift.
pub fn simple_moving_average(closes: &[f64], window: usize) -> MovingAverage {
    let values = (0..closes.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let sum: f64 = closes[i + 1 - window..=i].iter().sum();
            Some(sum / window as f64)
        })
        .collect();
    MovingAverage { window, values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_waits_for_full_window() {
        let sma = simple_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(sma.values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(sma.latest(), Some(4.0));
    }

    #[test]
    fn sma_matches_direct_window_mean_over_long_series() {
        let closes: Vec<f64> = (0..10_000)
            .map(|i| 100.0 + (i % 37) as f64 * 0.1 + if i % 2 == 0 { 1e6 } else { 0.0 })
            .collect();
        let sma = simple_moving_average(&closes, 200);
        let tail = &closes[closes.len() - 200..];
        let expected = tail.iter().sum::<f64>() / 200.0;
        assert_eq!(sma.latest(), Some(expected));
        assert_eq!(sma.values.iter().filter(|v| v.is_some()).count(), 10_000 - 199);
    }

    #[test]
    fn sma_longer_than_series_is_empty() {
        let sma = simple_moving_average(&[1.0, 2.0], 200);
        assert_eq!(sma.values, vec![None, None]);
        assert_eq!(sma.latest(), None);
    }

    #[test]
    fn parses_chart_and_skips_gaps() {
        let raw = br#"{"chart":{"result":[{
            "meta":{"symbol":"AAPL"},
            "timestamp":[1700000000,1700086400,1700172800],
            "indicators":{"quote":[{
                "open":[10.0,null,12.0],
                "high":[11.0,null,13.0],
                "low":[9.0,null,11.5],
                "close":[10.5,null,12.5],
                "volume":[100,null,300]
            }]}
        }],"error":null}}"#;
        let bars = parse_chart(raw, "AAPL").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].volume, 300);
        assert_eq!(bars[1].timestamp.timestamp(), 1700172800);
    }

    #[test]
    fn surfaces_chart_errors() {
        let raw = br#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(raw, "ZZZZ").unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn share_class_symbols_use_hyphens() {
        assert_eq!(chart_symbol("brk.b"), "BRK-B");
    }
}
