use chrono::{Duration, Utc};
use finance_query_core::{YahooError, YahooFinanceClient};
use serde_json::Value;

use crate::service::earnings::extract::TIMESERIES_REVENUE_FIELDS;

/// Default lookback for quarterly statement queries (in years).
pub const FETCH_YEARS_DEFAULT: i64 = 2;

/// Fetch the quarterly revenue lines of the income statement from Yahoo
/// Finance fundamentals-timeseries over a configurable lookback.
pub async fn fetch_quarterly_revenue_timeseries(
    client: &YahooFinanceClient,
    symbol: &str,
    years_back: i64,
) -> Result<Value, YahooError> {
    let now = Utc::now().timestamp();
    let start = now - Duration::days(365 * years_back).num_seconds();

    let refs: Vec<&str> = TIMESERIES_REVENUE_FIELDS.to_vec();

    client
        .get_fundamentals_timeseries(symbol, start, now, &refs)
        .await
}
