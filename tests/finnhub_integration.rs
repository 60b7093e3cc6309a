use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::to_string_pretty;

use stacks_earnings::config::Settings;
use stacks_earnings::models::Symbol;
use stacks_earnings::service::earnings::EarningsReconciler;
use stacks_earnings::service::finance::finnhub::FinnhubClient;
use stacks_earnings::service::finance::FinanceService;

/// Live reconciliation against Finnhub and Yahoo.
///
/// Needs `FINNHUB_API_KEY`. Run manually with:
/// `cargo test -- --ignored reconciles_live_snapshot`.
#[tokio::test]
#[ignore = "requires external network access and FINNHUB_API_KEY"]
async fn reconciles_live_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let settings = Settings::from_env()?;

    let finnhub = Arc::new(FinnhubClient::new(
        settings.finnhub_api_key.clone(),
        settings.finnhub_base_url.clone(),
        settings.http_timeout,
    )?);
    let finance = Arc::new(FinanceService::new(
        settings.proxy.clone(),
        Duration::from_secs(20),
    )?);
    let reconciler = EarningsReconciler::new(finnhub, finance, settings.reconcile);

    let symbol = Symbol::parse("AAPL")?;
    let snapshot = reconciler.reconcile(&symbol).await;

    let pretty = to_string_pretty(&snapshot)?;
    let out_path = Path::new("build-docs/stacks-bot-docs/json_output/snapshot_output.json");
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, &pretty)?;
    println!("snapshot saved to {}\n{}", out_path.display(), pretty);

    assert_eq!(snapshot.ticker.as_str(), "AAPL");
    assert!(snapshot.eps_surprise_pct.is_finite());
    assert!(snapshot.revenue_surprise_pct.is_finite());
    assert!(
        snapshot.eps_actual.is_known() || snapshot.revenue_actual_b.is_known(),
        "expected at least one reported actual for AAPL"
    );

    Ok(())
}
