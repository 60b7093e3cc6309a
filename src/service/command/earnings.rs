use chrono_tz::America::New_York;
use serenity::all::{CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption};
use tracing::info;

use crate::models::{FinancialSnapshot, Metric, Symbol};
use crate::service::command::{get_str_opt, human_amount, ratio_or_na};
use crate::service::earnings::EarningsReconciler;

pub fn register_command() -> CreateCommand {
    CreateCommand::new("earnings")
        .description("Latest earnings: EPS and revenue vs estimates")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "ticker",
                "Ticker symbol, e.g., AAPL",
            )
            .required(true),
        )
}

pub async fn handle(
    command: &CommandInteraction,
    reconciler: &EarningsReconciler,
) -> Result<String, String> {
    let ticker = get_str_opt(command, "ticker").ok_or("ticker is required")?;
    handle_text(reconciler, ticker).await
}

pub async fn handle_text(reconciler: &EarningsReconciler, ticker: &str) -> Result<String, String> {
    let symbol = Symbol::parse(ticker).map_err(|e| e.to_string())?;
    let snapshot = reconciler.reconcile(&symbol).await;
    info!("Formatting earnings snapshot for {}", symbol);
    Ok(format_snapshot(&snapshot))
}

fn signed_pct(pct: f64) -> String {
    format!("{pct:+.2}%")
}

fn billions(m: &Metric, decimals: usize) -> String {
    match m.value() {
        Some(v) => format!("{:.*}B", decimals, v),
        None => "N/A".to_string(),
    }
}

/// Text rendition of the earnings card. Unknown EPS shows as "TBD", never as
/// a zero amount.
pub fn format_snapshot(s: &FinancialSnapshot) -> String {
    let mut lines = Vec::new();

    let company = s
        .profile
        .as_ref()
        .and_then(|p| p.short_name.clone())
        .unwrap_or_else(|| s.ticker.to_string());
    let quarter = s
        .period
        .as_ref()
        .and_then(|p| p.label())
        .map(|q| format!(" {q}"))
        .unwrap_or_default();
    lines.push(format!("📊 **{}** — ${}{}", company, s.ticker, quarter));

    if let Some(p) = &s.profile {
        lines.push(format!(
            "Market Cap: **{}** | P/E: **{}** | Forward P/E: **{}** | PEG: **{}**",
            human_amount(p.market_cap),
            ratio_or_na(p.trailing_pe),
            ratio_or_na(p.forward_pe),
            ratio_or_na(p.peg_ratio)
        ));
    }
    lines.push(String::new());

    let eps_est = s
        .eps_estimate
        .non_zero()
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    lines.push(format!(
        "**EPS** {} (Est. {}) {}",
        s.eps_actual.display_with(|v| format!("{v:.2}")),
        eps_est,
        signed_pct(s.eps_surprise_pct)
    ));

    let mut revenue_line = format!(
        "**Revenue** {} (Est. {}) {}",
        billions(&s.revenue_actual_b, 2),
        billions(&s.revenue_estimate_b, 2),
        signed_pct(s.revenue_surprise_pct)
    );
    if s.revenue_fallback_used() {
        revenue_line.push_str(" ⚠️ from quarterly statement fallback");
    }
    lines.push(revenue_line);

    lines.push(format!(
        "**Next Qtr EPS** {}",
        s.next_quarter_eps_estimate.display_with(|v| format!("{v:.2}"))
    ));

    let next_rev_delta = if s.next_quarter_revenue_b.is_known() {
        signed_pct(s.next_quarter_revenue_surprise_pct)
    } else {
        "N/A".to_string()
    };
    lines.push(format!(
        "**Next Qtr Rev** {} {}",
        billions(&s.next_quarter_revenue_b, 0),
        next_rev_delta
    ));

    lines.push(format!(
        "**Annual** EPS {} | Revenue {}",
        s.annual_eps_estimate.display_with(|v| format!("{v:.2}")),
        s.annual_revenue_b.display_with(|v| format!("{v:.2}B"))
    ));

    lines.push(String::new());
    let released = s
        .period
        .as_ref()
        .and_then(|p| p.period_end)
        .map(|d| format!("Period ending {}. ", d.format("%Y-%m-%d")))
        .unwrap_or_default();
    lines.push(format!(
        "*{}Fetched {} ET. Informational purposes only.*",
        released,
        s.fetched_at.with_timezone(&New_York).format("%Y-%m-%d %-I:%M %p")
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyProfile, FiscalPeriod, RevenueSource};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            ticker: Symbol::parse("AAPL").unwrap(),
            fetched_at: Utc.with_ymd_and_hms(2025, 8, 28, 14, 0, 0).unwrap(),
            period: Some(FiscalPeriod {
                period_end: NaiveDate::from_ymd_opt(2025, 6, 30),
                year: Some(2026),
                quarter: Some(2),
            }),
            profile: Some(CompanyProfile {
                symbol: "AAPL".into(),
                short_name: Some("Apple Inc.".into()),
                market_cap: Some(3.4e12),
                trailing_pe: Some(35.123),
                forward_pe: None,
                peg_ratio: Some(2.0),
                shares_outstanding: None,
            }),
            eps_actual: Metric::Known(1.04),
            eps_estimate: Metric::Known(1.01),
            eps_surprise_pct: 2.97,
            revenue_actual_b: Metric::Known(46.74),
            revenue_actual_source: Some(RevenueSource::SecondaryStatement),
            revenue_estimate_b: Metric::Known(45.0),
            revenue_estimate_basis: None,
            revenue_surprise_pct: 3.87,
            shares_outstanding: Metric::Known(15e9),
            shares_source: None,
            next_quarter_eps_estimate: Metric::not_reported(),
            next_quarter_revenue_b: Metric::Known(52.76),
            next_quarter_revenue_surprise_pct: 12.88,
            annual_eps_estimate: Metric::Known(6.5),
            annual_revenue_b: Metric::upstream("timeout"),
        }
    }

    #[test]
    fn renders_card_lines() {
        let text = format_snapshot(&snapshot());
        assert!(text.contains("**Apple Inc.** — $AAPL Q2 2026"));
        assert!(text.contains("Market Cap: **3.40T** | P/E: **35.12** | Forward P/E: **N/A**"));
        assert!(text.contains("**EPS** 1.04 (Est. 1.01) +2.97%"));
        assert!(text.contains("**Revenue** 46.74B (Est. 45.00B) +3.87% ⚠️"));
        assert!(text.contains("**Next Qtr EPS** TBD"));
        assert!(text.contains("**Next Qtr Rev** 53B +12.88%"));
        assert!(text.contains("**Annual** EPS 6.50 | Revenue TBD"));
        assert!(text.contains("Period ending 2025-06-30."));
        assert!(text.contains("Fetched 2025-08-28 10:00 AM ET"));
    }

    #[test]
    fn unknown_eps_is_tbd_not_zero() {
        let mut s = snapshot();
        s.eps_actual = Metric::upstream("down");
        s.eps_estimate = Metric::upstream("down");
        s.eps_surprise_pct = 0.0;
        let text = format_snapshot(&s);
        assert!(text.contains("**EPS** TBD (Est. N/A) +0.00%"));
        assert!(!text.contains("$0.00"));
    }
}
