//! Shared helpers for loosely typed numeric values.
//!
//! Sensor values reach us as JSON numbers, numeric strings or form fields.
//! They are parsed into `Decimal` so rounding to 2 places follows decimal
//! arithmetic (`21.565` → `21.57`) instead of the nearest binary float.
//!
//! - `parse_decimal`: explicit parse attempt for numeric strings
//! - `json_number_to_decimal`: the same for JSON numbers
//! - `round_2dp`: half-away-from-zero rounding used by the numeric profile
//! - `dec_to_json_number`: back to a JSON number for responses

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places kept by the numeric normalization profile.
const ROUND_DP: u32 = 2;

/// Parse a numeric string into a Decimal.
///
/// Accepts plain (`"21.5"`, `"-3"`) and scientific (`"1.2e3"`) notation with
/// surrounding whitespace. Returns `None` for anything else, including the
/// empty string, `NaN` and `inf`.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    // rust_decimal tolerates digit separators, a numeric check must not
    if trimmed.is_empty() || trimmed.contains('_') {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// Convert a JSON number to Decimal. `None` when it is out of Decimal range.
pub(crate) fn json_number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    parse_decimal(&n.to_string())
}

/// Round to 2 decimal places, half away from zero, trailing zeros dropped.
pub(crate) fn round_2dp(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(ROUND_DP, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Convert a Decimal to a JSON number.
///
/// Whole values become integers so `99` stays `99` rather than `99.0`.
/// Returns `None` when no JSON number reads back as exactly `d`; callers
/// then fall back to the decimal string.
pub(crate) fn dec_to_json_number(d: Decimal) -> Option<serde_json::Number> {
    let d = d.normalize();
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Some(serde_json::Number::from(i));
        }
        if let Some(u) = d.to_u64() {
            return Some(serde_json::Number::from(u));
        }
    }
    let f: f64 = d.to_string().parse().ok()?;
    let n = serde_json::Number::from_f64(f)?;
    (parse_decimal(&n.to_string()) == Some(d)).then_some(n)
}
