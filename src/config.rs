//! Configuration module for WaterMonitor.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::telemetry::{DeriveOptions, NicknameMap, TimeParser, DEFAULT_HISTORY_CAP};

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("WATERMONITOR_NICKNAMES is not a JSON object of strings: {0}")]
    Nicknames(#[from] serde_json::Error),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the API server (default: 8080)
    pub http_port: u16,
    /// Spreadsheet web-app URL serving the telemetry rows (default: unset)
    pub sheet_url: String,
    /// Seconds between automatic refreshes (default: 60)
    pub refresh_secs: u64,
    /// Seconds before a sheet request is abandoned (default: 15)
    pub timeout_secs: u64,
    /// History points kept per sensor (default: 20)
    pub history_cap: usize,
    /// Offset applied to timestamps without a zone, in minutes east of UTC (default: 0)
    pub utc_offset_minutes: i32,
    /// Device id to friendly name mapping (default: empty)
    pub nicknames: NicknameMap,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            sheet_url: String::new(),
            refresh_secs: 60,
            timeout_secs: 15,
            history_cap: DEFAULT_HISTORY_CAP,
            utc_offset_minutes: 0,
            nicknames: NicknameMap::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WATERMONITOR_HTTP_PORT`: HTTP port (default: 8080)
    /// - `WATERMONITOR_SHEET_URL`: sheet web-app URL (default: unset)
    /// - `WATERMONITOR_REFRESH_SECS`: refresh interval (default: 60)
    /// - `WATERMONITOR_TIMEOUT_SECS`: fetch timeout (default: 15)
    /// - `WATERMONITOR_HISTORY_CAP`: history length (default: 20)
    /// - `WATERMONITOR_UTC_OFFSET_MINUTES`: offset for naive times (default: 0)
    /// - `WATERMONITOR_NICKNAMES`: JSON object of id to nickname (default: `{}`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("WATERMONITOR_HTTP_PORT").and_then(|s| s.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(url) = lookup("WATERMONITOR_SHEET_URL") {
            cfg.sheet_url = url;
        }

        if let Some(secs) = lookup("WATERMONITOR_REFRESH_SECS").and_then(|s| s.parse().ok()) {
            if secs > 0 {
                cfg.refresh_secs = secs;
            }
        }

        if let Some(secs) = lookup("WATERMONITOR_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            if secs > 0 {
                cfg.timeout_secs = secs;
            }
        }

        if let Some(cap) = lookup("WATERMONITOR_HISTORY_CAP").and_then(|s| s.parse().ok()) {
            if cap > 0 {
                cfg.history_cap = cap;
            }
        }

        if let Some(minutes) = lookup("WATERMONITOR_UTC_OFFSET_MINUTES").and_then(|s| s.parse().ok()) {
            cfg.utc_offset_minutes = minutes;
        }

        if let Some(json) = lookup("WATERMONITOR_NICKNAMES") {
            if !json.trim().is_empty() {
                cfg.nicknames = NicknameMap::from_json(&json)?;
            }
        }

        Ok(cfg)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions {
            history_cap: self.history_cap,
            time: TimeParser::with_offset_minutes(self.utc_offset_minutes),
            nicknames: self.nicknames.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.refresh_secs, 60);
        assert_eq!(cfg.history_cap, 20);
        assert!(cfg.sheet_url.is_empty());
        assert!(cfg.nicknames.is_empty());
    }

    #[test]
    fn test_overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("WATERMONITOR_HTTP_PORT", "9000"),
            ("WATERMONITOR_SHEET_URL", "https://script.example.com/exec"),
            ("WATERMONITOR_REFRESH_SECS", "30"),
            ("WATERMONITOR_HISTORY_CAP", "50"),
            ("WATERMONITOR_UTC_OFFSET_MINUTES", "330"),
            ("WATERMONITOR_NICKNAMES", r#"{"TX-01": "North Plot"}"#),
        ]))
        .unwrap();

        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.sheet_url, "https://script.example.com/exec");
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(30));
        assert_eq!(cfg.history_cap, 50);
        assert_eq!(cfg.nicknames.resolve("TX-01"), "North Plot");

        let options = cfg.derive_options();
        assert_eq!(options.history_cap, 50);
        assert_eq!(options.time.offset().local_minus_utc(), 330 * 60);
    }

    #[test]
    fn test_bad_numbers_keep_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("WATERMONITOR_HTTP_PORT", "eighty"),
            ("WATERMONITOR_REFRESH_SECS", "0"),
            ("WATERMONITOR_HISTORY_CAP", "-3"),
        ]))
        .unwrap();

        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.refresh_secs, 60);
        assert_eq!(cfg.history_cap, 20);
    }

    #[test]
    fn test_bad_nicknames_is_error() {
        let result = ServerConfig::from_lookup(lookup(&[("WATERMONITOR_NICKNAMES", "not json")]));
        assert!(matches!(result, Err(ConfigError::Nicknames(_))));
    }
}
