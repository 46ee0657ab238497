use std::str::FromStr;
use std::time::Duration;

use crate::services::normalizer::Profile;

/// Largest station clock offset accepted, in hours either side of UTC.
const MAX_UTC_OFFSET_HOURS: i64 = 24;

/// Configuration errors, reported once at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration, parsed from environment variables.
///
/// Read once at startup and never changed afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Upstream ingestion endpoint every reading is relayed to.
    pub upstream_url: String,
    pub port: u16,
    pub profile: Profile,
    pub relay_timeout: Duration,
    /// Maximum in-flight upstream calls per request (1 = sequential).
    pub relay_concurrency: usize,
    pub user_agent: String,
    /// Station id stamped on console reports that carry none.
    pub device_station_id: Option<i64>,
    /// Hours added to the console's UTC timestamp.
    pub device_utc_offset_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let upstream_url = lookup("UPSTREAM_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("UPSTREAM_URL"))?;
        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_URL",
                reason: format!("'{}' is not an http(s) URL", upstream_url),
            });
        }

        let relay_concurrency: usize = parse_or(&lookup, "RELAY_CONCURRENCY", 1)?;
        if relay_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "RELAY_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }

        let device_utc_offset_hours: i64 = parse_or(&lookup, "DEVICE_UTC_OFFSET_HOURS", 7)?;
        if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&device_utc_offset_hours) {
            return Err(ConfigError::Invalid {
                name: "DEVICE_UTC_OFFSET_HOURS",
                reason: format!("must be between -{0} and {0}", MAX_UTC_OFFSET_HOURS),
            });
        }

        Ok(Self {
            upstream_url,
            port: parse_or(&lookup, "PORT", 8080)?,
            profile: parse_or(&lookup, "NORMALIZE_PROFILE", Profile::Numeric)?,
            relay_timeout: Duration::from_secs(parse_or(&lookup, "RELAY_TIMEOUT_SECS", 10)?),
            relay_concurrency,
            user_agent: lookup("RELAY_USER_AGENT")
                .unwrap_or_else(|| format!("WeatherRelay/{}", env!("CARGO_PKG_VERSION"))),
            device_station_id: lookup("DEVICE_STATION_ID")
                .map(|v| parse_value("DEVICE_STATION_ID", &v))
                .transpose()?,
            device_utc_offset_hours,
        })
    }

    /// Log the loaded configuration.
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  UPSTREAM_URL            : {}", self.upstream_url);
        tracing::info!("  PORT                    : {}", self.port);
        tracing::info!("  NORMALIZE_PROFILE       : {}", self.profile);
        tracing::info!("  RELAY_TIMEOUT_SECS      : {}", self.relay_timeout.as_secs());
        tracing::info!("  RELAY_CONCURRENCY       : {}", self.relay_concurrency);
        tracing::info!("  DEVICE_STATION_ID       : {:?}", self.device_station_id);
        tracing::info!("  DEVICE_UTC_OFFSET_HOURS : {}", self.device_utc_offset_hours);
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}
