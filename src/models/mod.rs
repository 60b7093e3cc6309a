pub mod history;
pub mod metric;
pub mod snapshot;
pub mod symbol;

pub use history::{ChartSeries, HistoryPeriod, MovingAverage, PriceBar};
pub use metric::{Metric, Unknown};
pub use snapshot::{
    CompanyProfile, EstimateBasis, FinancialSnapshot, FiscalPeriod, RevenueSource, SharesSource,
};
pub use symbol::{Symbol, SymbolError};

/// Reporting frequency for statement queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Quarterly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Quarterly => "quarterly",
        }
    }
}
