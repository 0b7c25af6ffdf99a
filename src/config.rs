// SPDX-License-Identifier: MPL-2.0

//! Application constants and runtime configuration.
//!
//! Runtime settings come from environment variables; a `.env` file in the
//! working directory is honored for local development.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const APP_NAME: &str = "Inkdrop";

pub const DEFAULT_API_URL: &str = "https://api.inkdrop.app";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Check-in awards currency server-side and is allowed to take longer.
pub const CHECK_IN_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_LOG_FILTER: &str = "inkdrop=info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error("could not determine a data directory")]
    NoDataDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub request_timeout: Duration,
    pub check_in_timeout: Duration,
    pub data_dir: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url_str = lookup("INKDROP_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url_str)
            .map_err(|e| ConfigError::InvalidValue("INKDROP_API_URL".to_string(), e.to_string()))?;

        let request_timeout = match lookup("INKDROP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "INKDROP_TIMEOUT_SECS".to_string(),
                        format!("'{raw}' is not a whole number of seconds"),
                    )
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "INKDROP_TIMEOUT_SECS".to_string(),
                        "timeout must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        let data_dir = match lookup("INKDROP_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|p| p.join("inkdrop"))
                .ok_or(ConfigError::NoDataDir)?,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            api_url,
            request_timeout,
            check_in_timeout: CHECK_IN_TIMEOUT.max(request_timeout),
            data_dir,
            log_filter,
        })
    }

    /// Path of the on-device key-value database.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("INKDROP_DATA_DIR", "/tmp/inkdrop")])).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.inkdrop.app/");
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.check_in_timeout, CHECK_IN_TIMEOUT);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/inkdrop/storage.db"));
    }

    #[test]
    fn test_overrides_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("INKDROP_API_URL", "http://localhost:4000"),
            ("INKDROP_TIMEOUT_SECS", "45"),
            ("INKDROP_DATA_DIR", "/data"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:4000/");
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        // Check-in never gets a shorter budget than ordinary requests
        assert_eq!(config.check_in_timeout, Duration::from_secs(45));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("INKDROP_TIMEOUT_SECS", "soon"),
            ("INKDROP_DATA_DIR", "/data"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "INKDROP_TIMEOUT_SECS"));

        let err = Config::from_lookup(lookup_from(&[
            ("INKDROP_TIMEOUT_SECS", "0"),
            ("INKDROP_DATA_DIR", "/data"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("INKDROP_API_URL", "not a url"),
            ("INKDROP_DATA_DIR", "/data"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "INKDROP_API_URL"));
    }
}
