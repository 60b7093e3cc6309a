use serde_json::Value;

use crate::models::Metric;

pub const BILLION: f64 = 1e9;

/// Best-effort numeric read of a provider field.
///
/// Accepts JSON numbers, numeric strings with thousands separators, and
/// Yahoo-style `{"raw": n}` wrappers. Anything else (including NaN after
/// parsing) is `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        Value::Object(map) => map.get("raw").and_then(coerce_f64),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerces the first of `keys` present on `obj` that holds a number.
pub fn first_numeric(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(coerce_f64))
}

/// Like [`first_numeric`] but skips zeros.
pub fn first_non_zero(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(coerce_f64).filter(|v| *v != 0.0))
}

/// Like [`first_numeric`] but only accepts strictly positive values.
pub fn first_positive(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(coerce_f64).filter(|v| *v > 0.0))
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        // -0.0 + 0.0 == +0.0
        rounded + 0.0
    } else {
        value
    }
}

/// `(numer - denom) / denom * 100`, or `0.0` when the denominator is zero,
/// non-finite, or the result would not be finite.
pub fn percent_change(numer: f64, denom: f64, decimals: Option<u32>) -> f64 {
    if denom == 0.0 || !denom.is_finite() || !numer.is_finite() {
        return 0.0;
    }
    let pct = (numer - denom) / denom * 100.0;
    if !pct.is_finite() {
        return 0.0;
    }
    match decimals {
        Some(d) => round_to(pct, d),
        None => pct,
    }
}

/// Surprise of `actual` over `estimate`. An unknown estimate is neutral.
pub fn surprise_pct(actual: &Metric, estimate: &Metric, decimals: Option<u32>) -> f64 {
    match estimate.value() {
        Some(denom) => percent_change(actual.or_zero(), denom, decimals),
        None => 0.0,
    }
}

pub fn to_billions(raw: f64) -> f64 {
    raw / BILLION
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_permissively() {
        assert_eq!(coerce_f64(&json!(1.25)), Some(1.25));
        assert_eq!(coerce_f64(&json!("12,300,000,000")), Some(12_300_000_000.0));
        assert_eq!(coerce_f64(&json!(" 3.5 ")), Some(3.5));
        assert_eq!(coerce_f64(&json!({"raw": 7.0, "fmt": "7.00"})), Some(7.0));
        assert_eq!(coerce_f64(&json!("")), None);
        assert_eq!(coerce_f64(&json!("n/a")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!(true)), None);
    }

    #[test]
    fn eps_surprise_rounds_to_two_places() {
        let pct = surprise_pct(&Metric::Known(1.04), &Metric::Known(1.01), Some(2));
        assert_eq!(pct, 2.97);
    }

    #[test]
    fn unrounded_when_decimals_disabled() {
        let pct = percent_change(1.04, 1.01, None);
        assert!((pct - 2.970_297_029_7).abs() < 1e-6);
    }

    #[test]
    fn degenerate_denominators_are_neutral() {
        for (numer, denom) in [
            (5.0, 0.0),
            (0.0, 0.0),
            (-3.0, -0.0),
            (1.0, f64::NAN),
            (1.0, f64::INFINITY),
            (f64::NAN, 2.0),
            (f64::MAX, f64::MIN_POSITIVE),
        ] {
            let pct = percent_change(numer, denom, Some(2));
            assert!(pct.is_finite(), "{numer}/{denom} gave {pct}");
        }
        assert_eq!(percent_change(5.0, 0.0, Some(2)), 0.0);
        assert_eq!(surprise_pct(&Metric::Known(1.0), &Metric::not_reported(), Some(2)), 0.0);
    }

    #[test]
    fn percent_is_finite_across_a_grid() {
        let samples = [-1e12, -10.0, -1.0, -1e-9, 0.0, 1e-9, 0.5, 1.0, 42.0, 1e12];
        for numer in samples {
            for denom in samples {
                assert!(percent_change(numer, denom, Some(2)).is_finite());
                assert!(percent_change(numer, denom, None).is_finite());
            }
        }
    }

    #[test]
    fn first_non_zero_skips_zero_and_text() {
        let obj = json!({"a": 0, "b": "x", "c": "1.19"});
        assert_eq!(first_non_zero(&obj, &["a", "b", "c"]), Some(1.19));
        assert_eq!(first_numeric(&obj, &["a", "c"]), Some(0.0));
    }

    #[test]
    fn first_positive_skips_negative_counts() {
        let obj = json!({"sharesOutstanding": -1e9, "shareOutstanding": "2,000"});
        assert_eq!(
            first_positive(&obj, &["sharesOutstanding", "shareOutstanding"]),
            Some(2000.0)
        );
        assert_eq!(first_positive(&json!({"a": -3}), &["a"]), None);
    }

    #[test]
    fn tiny_negative_surprise_rounds_to_positive_zero() {
        let pct = percent_change(0.99999, 1.0, Some(2));
        assert_eq!(pct, 0.0);
        assert!(pct.is_sign_positive());
        assert_eq!(format!("{pct:+.2}%"), "+0.00%");
        assert!(round_to(-0.001, 2).is_sign_positive());
    }
}
