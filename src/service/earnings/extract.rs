//! Revenue lookup over income statements whose shape differs by provider and
//! by provider version.
//!
//! A statement is either a mapping of field → value or a list of line-item
//! records. Each shape is searched by an ordered list of strategies; the first
//! strategy that yields a number wins and nothing is averaged or merged.

use serde_json::{Map, Value};

use super::coerce::coerce_f64;

/// Revenue keys/labels for the fundamentals provider's reported statements,
/// in priority order.
pub const REVENUE_CANDIDATES: &[&str] = &[
    "Revenue",
    "TotalRevenue",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "Total revenue",
    "Total Revenues",
    "Revenues",
];

/// Fundamentals-timeseries field names carrying quarterly revenue.
pub const TIMESERIES_REVENUE_FIELDS: &[&str] =
    &["quarterlyTotalRevenue", "quarterlyOperatingRevenue"];

const LABEL_FIELDS: &[&str] = &["label", "concept", "name"];
const VALUE_FIELDS: &[&str] = &["value", "val", "amount"];

/// Line items that mention revenue without being revenue.
const LABEL_EXCLUSIONS: &[&str] = &["cost", "deferred", "unearned"];

/// How a single line-item record is matched against the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemStrategy {
    /// The record itself has a candidate as a key.
    CandidateKey,
    /// A label/concept/name field contains a candidate, value held separately.
    LabelText,
}

pub const LINE_ITEM_STRATEGIES: &[LineItemStrategy] =
    &[LineItemStrategy::CandidateKey, LineItemStrategy::LabelText];

impl LineItemStrategy {
    pub fn extract(&self, row: &Map<String, Value>, candidates: &[&str]) -> Option<f64> {
        match self {
            LineItemStrategy::CandidateKey => from_keys(row, candidates),
            LineItemStrategy::LabelText => {
                let value = VALUE_FIELDS
                    .iter()
                    .find_map(|k| row.get(*k).filter(|v| !v.is_null()))?;
                let matched = LABEL_FIELDS
                    .iter()
                    .filter_map(|k| row.get(*k).and_then(|v| v.as_str()))
                    .any(|label| label_matches(label, candidates));
                if matched {
                    coerce_f64(value)
                } else {
                    None
                }
            }
        }
    }
}

fn from_keys(map: &Map<String, Value>, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|k| map.get(*k).and_then(coerce_f64))
}

fn label_matches(label: &str, candidates: &[&str]) -> bool {
    let label = label.to_ascii_lowercase();
    if LABEL_EXCLUSIONS.iter().any(|x| label.contains(x)) {
        return false;
    }
    candidates
        .iter()
        .any(|c| label.contains(&c.to_ascii_lowercase()))
}

/// Finds a revenue figure in a statement shaped as a mapping or as a list of
/// line items.
pub fn find_revenue(statement: &Value, candidates: &[&str]) -> Option<f64> {
    match statement {
        Value::Object(map) => from_keys(map, candidates),
        Value::Array(rows) => rows.iter().filter_map(Value::as_object).find_map(|row| {
            LINE_ITEM_STRATEGIES
                .iter()
                .find_map(|s| s.extract(row, candidates))
        }),
        _ => None,
    }
}

/// Income-statement section of the latest entry of a reported-financials
/// payload. Accepts `{"data": [...]}` or a bare list; the section sits at
/// `report.ic` or directly at `ic`.
pub fn latest_income_statement(payload: &Value) -> Option<&Value> {
    let entries = match payload {
        Value::Object(map) => map.get("data")?.as_array()?,
        Value::Array(list) => list,
        _ => return None,
    };
    let first = entries.first()?.as_object()?;
    first
        .get("report")
        .and_then(|r| r.get("ic"))
        .filter(|ic| !ic.is_null())
        .or_else(|| first.get("ic"))
        .filter(|ic| !ic.is_null())
}

/// Revenue from a fundamentals provider's reported-financials payload.
pub fn primary_statement_revenue(payload: &Value) -> Option<f64> {
    latest_income_statement(payload).and_then(|ic| find_revenue(ic, REVENUE_CANDIDATES))
}

/// Latest-dated value of `field` in a fundamentals timeseries payload.
pub fn latest_timeseries_value(data: &Value, field: &str) -> Option<f64> {
    let results = data
        .get("timeseries")
        .and_then(|t| t.get("result"))
        .and_then(|r| r.as_array())?;

    let mut latest: Option<(&str, f64)> = None;
    for entry in results {
        let Some(values) = entry.get(field).and_then(|v| v.as_array()) else {
            continue;
        };
        for item in values {
            let raw = item
                .get("reportedValue")
                .and_then(coerce_f64)
                .or_else(|| item.get("raw").and_then(coerce_f64));
            let Some(raw) = raw else { continue };
            let date = item.get("asOfDate").and_then(|d| d.as_str()).unwrap_or("");
            // ISO dates compare correctly as strings.
            if latest.map(|(d, _)| date >= d).unwrap_or(true) {
                latest = Some((date, raw));
            }
        }
    }
    latest.map(|(_, v)| v)
}

/// Revenue from the profile provider's quarterly income statement. Reads the
/// timeseries shape first and falls back to the generic candidate search.
pub fn secondary_statement_revenue(data: &Value) -> Option<f64> {
    TIMESERIES_REVENUE_FIELDS
        .iter()
        .find_map(|f| latest_timeseries_value(data, f))
        .or_else(|| find_revenue(data, REVENUE_CANDIDATES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_uses_candidate_order() {
        let ic = json!({"Revenues": 1.0, "TotalRevenue": 5_000_000_000i64});
        assert_eq!(find_revenue(&ic, REVENUE_CANDIDATES), Some(5_000_000_000.0));
    }

    #[test]
    fn mapping_skips_non_numeric_candidates() {
        let ic = json!({"Revenue": "n/a", "TotalRevenue": "7,000"});
        assert_eq!(find_revenue(&ic, REVENUE_CANDIDATES), Some(7000.0));
    }

    #[test]
    fn line_items_match_by_label() {
        let ic = json!([
            {"label": "Cost of revenue", "value": 1},
            {"label": "Total Revenues", "value": "12,300,000,000"}
        ]);
        assert_eq!(find_revenue(&ic, REVENUE_CANDIDATES), Some(12_300_000_000.0));
    }

    #[test]
    fn line_items_match_by_concept_and_alt_value_field() {
        let ic = json!([
            {"concept": "us-gaap_NetIncomeLoss", "val": 10},
            {"concept": "us-gaap_Revenues", "label": "Net sales", "amount": 99.5}
        ]);
        assert_eq!(find_revenue(&ic, REVENUE_CANDIDATES), Some(99.5));
    }

    #[test]
    fn line_item_key_beats_its_label() {
        let ic = json!([{"label": "Revenues", "value": 1, "TotalRevenue": 2}]);
        assert_eq!(find_revenue(&ic, REVENUE_CANDIDATES), Some(2.0));
    }

    #[test]
    fn locates_income_statement_in_either_shape() {
        let nested = json!({"data": [{"report": {"ic": {"Revenue": 3}}}]});
        assert_eq!(primary_statement_revenue(&nested), Some(3.0));

        let bare = json!([{"ic": [{"label": "Revenue", "value": 4}]}]);
        assert_eq!(primary_statement_revenue(&bare), Some(4.0));

        assert_eq!(primary_statement_revenue(&json!({"data": []})), None);
        assert_eq!(primary_statement_revenue(&json!("oops")), None);
    }

    #[test]
    fn timeseries_takes_latest_date() {
        let data = json!({"timeseries": {"result": [{
            "meta": {"symbol": ["AAPL"], "type": ["quarterlyTotalRevenue"]},
            "quarterlyTotalRevenue": [
                {"asOfDate": "2025-03-31", "reportedValue": {"raw": 95.0}},
                {"asOfDate": "2025-06-30", "reportedValue": {"raw": 46_740_000_000.0}},
                null
            ]
        }]}});
        assert_eq!(secondary_statement_revenue(&data), Some(46_740_000_000.0));
    }

    #[test]
    fn timeseries_falls_back_to_operating_revenue() {
        let data = json!({"timeseries": {"result": [
            {"meta": {"type": ["quarterlyTotalRevenue"]}, "quarterlyTotalRevenue": [null]},
            {
                "meta": {"type": ["quarterlyOperatingRevenue"]},
                "quarterlyOperatingRevenue": [
                    {"asOfDate": "2025-06-30", "reportedValue": {"raw": 8_100_000_000.0}},
                    {"asOfDate": "2024-06-30", "reportedValue": {"raw": 7_000_000_000.0}}
                ]
            }
        ]}});
        assert_eq!(latest_timeseries_value(&data, "quarterlyTotalRevenue"), None);
        assert_eq!(secondary_statement_revenue(&data), Some(8_100_000_000.0));
    }

    #[test]
    fn secondary_accepts_plain_rows() {
        let data = json!([{"label": "Total Revenue", "value": "46,740,000,000"}]);
        assert_eq!(secondary_statement_revenue(&data), Some(46_740_000_000.0));
    }
}
