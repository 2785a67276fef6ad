// src/config.rs
use std::str::FromStr;
use std::time::Duration;

use crate::display::DEFAULT_TEXT_LIMIT;
use crate::dtos::dashboard::Period;
use crate::editing::table::DEFAULT_SAVED_FLAG;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub dashboard_refresh: Duration,
    pub dashboard_period: Period,
    pub saved_flag: Duration,
    pub text_truncate_limit: usize,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000/api".to_string(),
            dashboard_refresh: Duration::from_secs(5),
            dashboard_period: Period::Daily,
            saved_flag: DEFAULT_SAVED_FLAG,
            text_truncate_limit: DEFAULT_TEXT_LIMIT,
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let parsed = |key: &str| -> Result<Option<u64>, AppError> { parse_var(&lookup, key) };
        let nonzero = |key: &str| -> Result<Option<u64>, AppError> {
            match parsed(key)? {
                Some(0) => Err(AppError::config(format!("{key} must be greater than zero"))),
                value => Ok(value),
            }
        };

        Ok(Self {
            api_url: lookup("API_URL").unwrap_or(defaults.api_url),
            dashboard_refresh: nonzero("DASHBOARD_REFRESH_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.dashboard_refresh),
            dashboard_period: parse_var(&lookup, "DASHBOARD_PERIOD")?.unwrap_or(defaults.dashboard_period),
            saved_flag: parsed("SAVED_FLAG_MILLIS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.saved_flag),
            text_truncate_limit: parse_var(&lookup, "TEXT_TRUNCATE_LIMIT")?
                .unwrap_or(defaults.text_truncate_limit),
            http_timeout: nonzero("HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::config(format!("{key} has invalid value '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_vars_take_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dashboard_refresh, Duration::from_secs(5));
        assert_eq!(config.saved_flag, Duration::from_secs(2));
    }

    #[test]
    fn vars_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("API_URL", "http://shop.local/api"),
            ("DASHBOARD_REFRESH_SECS", "30"),
            ("DASHBOARD_PERIOD", "monthly"),
            ("TEXT_TRUNCATE_LIMIT", "12"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://shop.local/api");
        assert_eq!(config.dashboard_refresh, Duration::from_secs(30));
        assert_eq!(config.dashboard_period, Period::Monthly);
        assert_eq!(config.text_truncate_limit, 12);
    }

    #[test]
    fn malformed_number_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[("SAVED_FLAG_MILLIS", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn zero_intervals_are_config_errors() {
        for key in ["DASHBOARD_REFRESH_SECS", "HTTP_TIMEOUT_SECS"] {
            let err = Config::from_lookup(lookup(&[(key, "0")])).unwrap_err();
            assert!(matches!(&err, AppError::Config(msg) if msg.contains(key)), "{key}: {err:?}");
        }
        // a zero saved-flag duration just means no flag
        assert!(Config::from_lookup(lookup(&[("SAVED_FLAG_MILLIS", "0")])).is_ok());
    }
}
