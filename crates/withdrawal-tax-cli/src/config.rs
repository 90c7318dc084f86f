use chrono::Duration;
use std::path::PathBuf;

use crate::commands::MarketArgs;

pub const DEFAULT_CACHE_FILE: &str = "ticker_cache.json";
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Runtime settings. Flags win over `WTAX_*` environment variables, which win
/// over the built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cache_file: PathBuf,
    pub max_age: Duration,
    pub yahoo_base_url: String,
    pub http_timeout: std::time::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            http_timeout: std::time::Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Read settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = get("WTAX_CACHE_FILE") {
            settings.cache_file = PathBuf::from(path);
        }
        if let Some(hours) = get("WTAX_CACHE_MAX_AGE_HOURS") {
            settings.max_age = Duration::hours(parse_hours("WTAX_CACHE_MAX_AGE_HOURS", &hours)?);
        }
        if let Some(url) = get("WTAX_YAHOO_BASE_URL") {
            settings.yahoo_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("WTAX_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| format!("WTAX_HTTP_TIMEOUT_SECS must be a whole number, got '{secs}'"))?;
            settings.http_timeout = std::time::Duration::from_secs(secs);
        }
        Ok(settings)
    }

    /// Apply command-line overrides for the market-data cache.
    pub fn with_market_args(mut self, args: &MarketArgs) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(ref path) = args.cache_file {
            self.cache_file = PathBuf::from(path);
        }
        if let Some(hours) = args.max_age_hours {
            if hours < 0 {
                return Err(format!("--max-age-hours must be >= 0, got {hours}").into());
            }
            self.max_age = Duration::hours(hours);
        }
        Ok(self)
    }
}

fn parse_hours(key: &str, raw: &str) -> Result<i64, Box<dyn std::error::Error>> {
    match raw.parse::<i64>() {
        Ok(h) if h >= 0 => Ok(h),
        _ => Err(format!("{key} must be a non-negative whole number of hours, got '{raw}'").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let s = Settings::from_vars(vars(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.max_age, Duration::hours(24));
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let s = Settings::from_vars(vars(&[
            ("WTAX_CACHE_FILE", "/tmp/prices.json"),
            ("WTAX_CACHE_MAX_AGE_HOURS", "6"),
            ("WTAX_YAHOO_BASE_URL", "http://localhost:9000/"),
            ("WTAX_HTTP_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(s.cache_file, PathBuf::from("/tmp/prices.json"));
        assert_eq!(s.max_age, Duration::hours(6));
        assert_eq!(s.yahoo_base_url, "http://localhost:9000");
        assert_eq!(s.http_timeout, std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_blank_variable_is_ignored() {
        let s = Settings::from_vars(vars(&[("WTAX_CACHE_FILE", "  ")])).unwrap();
        assert_eq!(s.cache_file, PathBuf::from(DEFAULT_CACHE_FILE));
    }

    #[test]
    fn test_bad_max_age_rejected() {
        assert!(Settings::from_vars(vars(&[("WTAX_CACHE_MAX_AGE_HOURS", "-1")])).is_err());
        assert!(Settings::from_vars(vars(&[("WTAX_CACHE_MAX_AGE_HOURS", "soon")])).is_err());
    }

    #[test]
    fn test_flags_override_environment() {
        let env = Settings::from_vars(vars(&[("WTAX_CACHE_FILE", "env.json")])).unwrap();
        let args = MarketArgs {
            refresh: false,
            offline: false,
            cache_file: Some("flag.json".to_string()),
            max_age_hours: Some(0),
        };
        let s = env.with_market_args(&args).unwrap();
        assert_eq!(s.cache_file, PathBuf::from("flag.json"));
        assert_eq!(s.max_age, Duration::zero());
    }
}
