use serenity::all::{CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption};

use crate::models::{ChartSeries, HistoryPeriod, Symbol};
use crate::service::command::get_str_opt;
use crate::service::finance::FinanceService;

pub fn register_command() -> CreateCommand {
    let mut period = CreateCommandOption::new(
        CommandOptionType::String,
        "period",
        "Lookback (default 6mo)",
    );
    for p in HistoryPeriod::ALL {
        period = period.add_string_choice(p.as_str(), p.as_str());
    }

    CreateCommand::new("chart")
        .description("Last close with 20/50/200-day moving averages")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "ticker",
                "Ticker symbol, e.g., AAPL",
            )
            .required(true),
        )
        .add_option(period)
}

pub async fn handle(
    command: &CommandInteraction,
    finance: &FinanceService,
) -> Result<String, String> {
    let ticker = get_str_opt(command, "ticker").ok_or("ticker is required")?;
    let period = get_str_opt(command, "period");
    handle_text(finance, ticker, period).await
}

pub async fn handle_text(
    finance: &FinanceService,
    ticker: &str,
    period: Option<&str>,
) -> Result<String, String> {
    let symbol = Symbol::parse(ticker).map_err(|e| e.to_string())?;
    let period = match period {
        Some(raw) => raw.parse::<HistoryPeriod>()?,
        None => HistoryPeriod::default(),
    };

    let series = finance
        .get_chart_series(symbol.as_str(), period)
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    Ok(format_series(&series))
}

pub fn format_series(series: &ChartSeries) -> String {
    let close = series
        .last_close()
        .map(|c| format!("{c:.2}"))
        .unwrap_or_else(|| "N/A".to_string());

    let overlays = series
        .overlays
        .iter()
        .map(|o| {
            let v = o
                .latest()
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "N/A".to_string());
            format!("SMA{} {}", o.window, v)
        })
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "📈 **{}** ({}, {} sessions) — Close {}\n{}",
        series.symbol,
        series.period,
        series.bars.len(),
        close,
        overlays
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovingAverage, PriceBar};
    use chrono::{TimeZone, Utc};

    #[test]
    fn formats_unfilled_windows_as_na() {
        let series = ChartSeries {
            symbol: "AAPL".into(),
            period: HistoryPeriod::OneMonth,
            bars: vec![PriceBar {
                timestamp: Utc.with_ymd_and_hms(2025, 8, 27, 20, 0, 0).unwrap(),
                open: 180.0,
                high: 182.0,
                low: 179.0,
                close: 181.75,
                volume: 1_000,
            }],
            overlays: vec![
                MovingAverage { window: 20, values: vec![Some(178.4)] },
                MovingAverage { window: 200, values: vec![None] },
            ],
        };
        assert_eq!(
            format_series(&series),
            "📈 **AAPL** (1mo, 1 sessions) — Close 181.75\nSMA20 178.40 | SMA200 N/A"
        );
    }
}
