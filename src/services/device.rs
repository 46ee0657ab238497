//! Conversion of the console's native push format.
//!
//! The sensor console uploads Wunderground/Ecowitt style key-value pairs in
//! imperial units (`tempf=70.3&windspeedmph=4.5&dateutc=2025-03-01+01:15:00`).
//! This module maps them onto canonical field names and metric units; the
//! result goes through the same normalization and relay as JSON intake.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use std::collections::HashMap;

use crate::errors::AppError;
use crate::services::normalizer::RawRecord;

const MPH_TO_KMH: f64 = 1.60934;

/// Format of the console's `dateutc` field and of the relayed `date` field.
const DEVICE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A report must carry at least one of these to count as weather data.
const WEATHER_MARKERS: [&str; 3] = ["windspeedmph", "tempf", "humidity"];

/// Console fields copied as-is under their canonical name.
const COPIED_FIELDS: &[(&str, &str)] = &[
    ("winddir", "winddir"),
    ("rainratein", "rain_rate"),
    ("humidityin", "hum_in"),
    ("humidity", "hum_out"),
    ("uv", "uv"),
    ("baromrelin", "air_press_rel"),
    ("baromabsin", "air_press_abs"),
    ("solarradiation", "solar_radiation"),
    ("dailyrainin", "dailyrainin"),
    ("raintodayin", "raintodayin"),
    ("weeklyrainin", "weeklyrainin"),
    ("monthlyrainin", "monthlyrainin"),
    ("yearlyrainin", "yearlyrainin"),
    ("maxdailygust", "maxdailygust"),
    ("wh65batt", "wh65batt"),
];

/// Console fields that need a unit conversion.
const CONVERTED_FIELDS: &[(&str, &str, fn(f64) -> f64)] = &[
    ("windspeedmph", "windspeedkmh", mph_to_kmh),
    ("windgustmph", "wind_gust", mph_to_kmh),
    ("tempf", "temp_out", fahrenheit_to_celsius),
    ("tempinf", "temp_in", fahrenheit_to_celsius),
];

/// Station settings applied to console reports.
#[derive(Debug, Clone, Default)]
pub struct DeviceSettings {
    /// Station id used when the report has no `id` field.
    pub station_id: Option<i64>,
    /// Hours added to the console's UTC timestamp.
    pub utc_offset_hours: i64,
}

fn mph_to_kmh(mph: f64) -> f64 {
    mph * MPH_TO_KMH
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (5.0 / 9.0) * (f - 32.0)
}

/// Convert a console report into a raw record with canonical field names.
///
/// Fields the console did not send are left out so the normalizer's defaults
/// apply. A value that fails to parse is passed on verbatim.
pub fn device_report_to_record(
    params: &HashMap<String, String>,
    settings: &DeviceSettings,
    now: DateTime<Utc>,
) -> Result<RawRecord, AppError> {
    if !WEATHER_MARKERS.iter().any(|k| params.contains_key(*k)) {
        return Err(AppError::MalformedInput(
            "No weather fields in device report".to_string(),
        ));
    }

    let mut record = RawRecord::default();

    match (params.get("id"), settings.station_id) {
        (Some(id), _) => record.insert("idws", Value::String(id.clone())),
        (None, Some(id)) => record.insert("idws", Value::from(id)),
        (None, None) => {}
    }

    if let Some(date) = params.get("dateutc") {
        record.insert("date", Value::String(local_datetime(date, settings.utc_offset_hours, now)));
    }

    for (source, target) in COPIED_FIELDS {
        if let Some(value) = params.get(*source) {
            record.insert(target, Value::String(value.clone()));
        }
    }

    // Consoles without a raintodayin field report today's rain as dailyrainin
    if let Some(value) = params.get("raintodayin").or_else(|| params.get("dailyrainin")) {
        record.insert("rain_today", Value::String(value.clone()));
    }

    for (source, target, convert) in CONVERTED_FIELDS {
        if let Some(value) = params.get(*source) {
            record.insert(target, converted_value(value, *convert));
        }
    }

    Ok(record)
}

fn converted_value(raw: &str, convert: fn(f64) -> f64) -> Value {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|v| Number::from_f64(convert(v)))
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Shift the console's UTC timestamp into station-local time.
///
/// `now` stands for the current time; an unparseable value is kept as sent.
fn local_datetime(dateutc: &str, offset_hours: i64, now: DateTime<Utc>) -> String {
    let utc = if dateutc.trim().eq_ignore_ascii_case("now") {
        now.naive_utc()
    } else {
        match NaiveDateTime::parse_from_str(dateutc.trim(), DEVICE_DATETIME_FORMAT) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!("Unparseable dateutc '{}': {}, keeping original", dateutc, e);
                return dateutc.to_string();
            }
        }
    };
    match Duration::try_hours(offset_hours).and_then(|offset| utc.checked_add_signed(offset)) {
        Some(local) => local.format(DEVICE_DATETIME_FORMAT).to_string(),
        None => {
            tracing::warn!("dateutc '{}' out of range with offset {}h, keeping original", dateutc, offset_hours);
            dateutc.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T07:00:00Z".parse().unwrap()
    }

    fn settings() -> DeviceSettings {
        DeviceSettings {
            station_id: Some(44),
            utc_offset_hours: 7,
        }
    }

    #[test]
    fn test_rejects_report_without_weather_fields() {
        let err = device_report_to_record(&params(&[("PASSKEY", "abc")]), &settings(), now()).unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
    }

    #[test]
    fn test_unit_conversions() {
        let record = device_report_to_record(
            &params(&[("tempf", "212"), ("tempinf", "32"), ("windspeedmph", "10"), ("windgustmph", "0")]),
            &settings(),
            now(),
        )
        .unwrap();

        let temp_out = record.get("temp_out").and_then(Value::as_f64).unwrap();
        assert!((temp_out - 100.0).abs() < 1e-9);
        assert_eq!(record.get("temp_in").and_then(Value::as_f64), Some(0.0));
        let wind = record.get("windspeedkmh").and_then(Value::as_f64).unwrap();
        assert!((wind - 16.0934).abs() < 1e-9);
        assert_eq!(record.get("wind_gust").and_then(Value::as_f64), Some(0.0));
    }

    #[test]
    fn test_copied_fields_and_rain_today() {
        let record = device_report_to_record(
            &params(&[("humidity", "64"), ("baromrelin", "29.92"), ("dailyrainin", "0.12")]),
            &settings(),
            now(),
        )
        .unwrap();

        assert_eq!(record.get("hum_out"), Some(&Value::from("64")));
        assert_eq!(record.get("air_press_rel"), Some(&Value::from("29.92")));
        assert_eq!(record.get("dailyrainin"), Some(&Value::from("0.12")));
        assert_eq!(record.get("rain_today"), Some(&Value::from("0.12")));
        assert!(record.get("uv").is_none());
    }

    #[test]
    fn test_station_id() {
        let from_report =
            device_report_to_record(&params(&[("tempf", "70"), ("id", "12")]), &settings(), now()).unwrap();
        assert_eq!(from_report.get("idws"), Some(&Value::from("12")));

        let from_settings = device_report_to_record(&params(&[("tempf", "70")]), &settings(), now()).unwrap();
        assert_eq!(from_settings.get("idws"), Some(&Value::from(44)));

        let none = device_report_to_record(&params(&[("tempf", "70")]), &DeviceSettings::default(), now()).unwrap();
        assert!(none.get("idws").is_none());
    }

    #[test]
    fn test_dateutc_shifted_to_local() {
        let record = device_report_to_record(
            &params(&[("tempf", "70"), ("dateutc", "2025-12-31 20:30:00")]),
            &settings(),
            now(),
        )
        .unwrap();
        assert_eq!(record.get("date"), Some(&Value::from("2026-01-01 03:30:00")));
    }

    #[test]
    fn test_dateutc_now_and_garbage() {
        let record =
            device_report_to_record(&params(&[("tempf", "70"), ("dateutc", "now")]), &settings(), now()).unwrap();
        assert_eq!(record.get("date"), Some(&Value::from("2026-03-01 14:00:00")));

        let record =
            device_report_to_record(&params(&[("tempf", "70"), ("dateutc", "yesterday")]), &settings(), now())
                .unwrap();
        assert_eq!(record.get("date"), Some(&Value::from("yesterday")));
    }

    #[test]
    fn test_dateutc_out_of_range_kept_verbatim() {
        let record = device_report_to_record(
            &params(&[("tempf", "70"), ("dateutc", "+262142-12-31 23:59:59")]),
            &settings(),
            now(),
        )
        .unwrap();
        assert_eq!(record.get("date"), Some(&Value::from("+262142-12-31 23:59:59")));

        let huge_offset = DeviceSettings {
            station_id: None,
            utc_offset_hours: i64::MAX,
        };
        let record =
            device_report_to_record(&params(&[("tempf", "70"), ("dateutc", "2025-12-31 20:30:00")]), &huge_offset, now())
                .unwrap();
        assert_eq!(record.get("date"), Some(&Value::from("2025-12-31 20:30:00")));
    }

    #[test]
    fn test_unparseable_value_kept_verbatim() {
        let record = device_report_to_record(&params(&[("tempf", "--")]), &settings(), now()).unwrap();
        assert_eq!(record.get("temp_out"), Some(&Value::from("--")));
    }
}
