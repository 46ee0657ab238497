//! Reading normalization.
//!
//! Maps whatever field set a caller submitted onto the canonical weather
//! reading the upstream API expects. Every canonical field is always present
//! in the output; how a missing or odd value is filled in depends on the
//! active [`Profile`]:
//!
//! - `Numeric`: numbers and numeric strings are rounded to 2 decimal places;
//!   missing `idws` becomes 99, every other missing field becomes 0; empty
//!   strings and `false` become the empty value.
//! - `Passthrough`: values are kept as submitted; missing fields become the
//!   empty string.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::helpers::{dec_to_json_number, json_number_to_decimal, parse_decimal, round_2dp};

/// Station id used by the numeric profile when a reading carries none.
const DEFAULT_STATION_ID: i64 = 99;

/// Named normalization variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Round numeric values, default missing fields to 0 (99 for `idws`).
    #[default]
    Numeric,
    /// Keep values untouched, default missing fields to the empty string.
    Passthrough,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(Profile::Numeric),
            "passthrough" => Ok(Profile::Passthrough),
            other => Err(format!(
                "unknown profile '{}', expected 'numeric' or 'passthrough'",
                other
            )),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Numeric => f.write_str("numeric"),
            Profile::Passthrough => f.write_str("passthrough"),
        }
    }
}

/// A reading exactly as the caller submitted it: field name → untyped value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Build a record from any JSON value. Only objects carry named fields;
    /// anything else yields a record with no fields at all.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One normalized field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent, null, empty string or `false` (numeric profile).
    Empty,
    Number(Decimal),
    Text(String),
    /// Only produced by the passthrough profile.
    Bool(bool),
}

impl FieldValue {
    /// Value as sent in the form-encoded upstream request.
    pub fn to_form_value(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Number(d) => d.normalize().to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(true) => "1".to_string(),
            FieldValue::Bool(false) => "0".to_string(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Empty => serializer.serialize_str(""),
            FieldValue::Number(d) => match dec_to_json_number(*d) {
                Some(n) => n.serialize(serializer),
                None => serializer.serialize_str(&d.to_string()),
            },
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Declares the canonical reading struct together with its field list, so the
/// struct layout and the wire order can never drift apart.
macro_rules! canonical_reading {
    ($($field:ident),+ $(,)?) => {
        /// Canonical weather reading, fields in upstream wire order.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct WeatherReading {
            $(pub $field: FieldValue,)+
        }

        /// Canonical field names, in the order they are emitted.
        pub const CANONICAL_FIELDS: &[&str] = &[$(stringify!($field)),+];

        impl WeatherReading {
            fn from_fn(mut value_of: impl FnMut(&'static str) -> FieldValue) -> Self {
                Self {
                    $($field: value_of(stringify!($field)),)+
                }
            }

            /// `(name, value)` pairs in canonical order.
            pub fn fields(&self) -> Vec<(&'static str, &FieldValue)> {
                vec![$((stringify!($field), &self.$field)),+]
            }
        }
    };
}

canonical_reading!(
    idws,
    date,
    windspeedkmh,
    winddir,
    rain_rate,
    rain_today,
    temp_in,
    temp_out,
    hum_in,
    hum_out,
    uv,
    wind_gust,
    air_press_rel,
    air_press_abs,
    solar_radiation,
    dailyrainin,
    raintodayin,
    weeklyrainin,
    monthlyrainin,
    yearlyrainin,
    maxdailygust,
    wh65batt,
);

impl WeatherReading {
    /// Form body for the upstream request.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name, value.to_form_value()))
            .collect()
    }
}

/// Normalize a raw record into the canonical reading. Total: never fails.
pub fn normalize(raw: &RawRecord, profile: Profile) -> WeatherReading {
    match profile {
        Profile::Numeric => WeatherReading::from_fn(|field| numeric_value(field, raw.get(field))),
        Profile::Passthrough => WeatherReading::from_fn(|field| passthrough_value(raw.get(field))),
    }
}

/// Default for a field missing from a numeric-profile record.
fn numeric_default(field: &str) -> FieldValue {
    match field {
        "idws" => FieldValue::Number(Decimal::from(DEFAULT_STATION_ID)),
        _ => FieldValue::Number(Decimal::ZERO),
    }
}

fn numeric_value(field: &str, raw: Option<&Value>) -> FieldValue {
    match raw {
        None | Some(Value::Null) => numeric_default(field),
        Some(Value::Bool(false)) => FieldValue::Empty,
        Some(Value::Bool(true)) => FieldValue::Number(Decimal::ONE),
        Some(Value::String(s)) if s.is_empty() => FieldValue::Empty,
        Some(Value::String(s)) => match parse_decimal(s) {
            Some(d) => FieldValue::Number(round_2dp(d)),
            None => FieldValue::Text(s.clone()),
        },
        Some(Value::Number(n)) => match json_number_to_decimal(n) {
            Some(d) => FieldValue::Number(round_2dp(d)),
            None => FieldValue::Text(n.to_string()),
        },
        Some(Value::Array(_)) | Some(Value::Object(_)) => FieldValue::Empty,
    }
}

fn passthrough_value(raw: Option<&Value>) -> FieldValue {
    match raw {
        None | Some(Value::Null) => FieldValue::Empty,
        Some(Value::String(s)) if s.is_empty() => FieldValue::Empty,
        Some(Value::String(s)) => FieldValue::Text(s.clone()),
        // Numbers the echo could not write back as the same decimal stay text
        Some(Value::Number(n)) => match json_number_to_decimal(n).filter(|d| dec_to_json_number(*d).is_some()) {
            Some(d) => FieldValue::Number(d),
            None => FieldValue::Text(n.to_string()),
        },
        Some(Value::Bool(b)) => FieldValue::Bool(*b),
        Some(Value::Array(_)) | Some(Value::Object(_)) => FieldValue::Empty,
    }
}
