use std::path::PathBuf;
use std::time::Duration;

use devboards_client::config::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
use devboards_client::ClientConfig;
use devboards_core::job::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// A configuration variable was set to something unusable.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{var} has invalid value {value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL (default: `http://localhost:3000/api`).
    pub api_url: String,
    /// Bearer token for authenticated requests.
    pub api_token: Option<String>,
    /// Jobs requested per feed page (default: `20`, at most `100`).
    pub page_size: u32,
    /// Per-request timeout in seconds (default: `15`).
    pub request_timeout_secs: u64,
    /// Flat JSON catalog overriding the built-in English messages.
    pub locale_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                     |
    /// |----------------------------------|-----------------------------|
    /// | `DEVBOARDS_API_URL`              | `http://localhost:3000/api` |
    /// | `DEVBOARDS_API_TOKEN`            | unset                       |
    /// | `DEVBOARDS_PAGE_SIZE`            | `20`                        |
    /// | `DEVBOARDS_REQUEST_TIMEOUT_SECS` | `15`                        |
    /// | `DEVBOARDS_LOCALE_FILE`          | unset                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_url = get("DEVBOARDS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let api_token = get("DEVBOARDS_API_TOKEN");

        let page_size = match get("DEVBOARDS_PAGE_SIZE") {
            Some(raw) => parse_page_size(&raw)?,
            None => DEFAULT_PAGE_SIZE,
        };

        let request_timeout_secs = match get("DEVBOARDS_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_REQUEST_TIMEOUT.as_secs(),
        };

        let locale_file = get("DEVBOARDS_LOCALE_FILE").map(PathBuf::from);

        Ok(Self {
            api_url,
            api_token,
            page_size,
            request_timeout_secs,
            locale_file,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_secs));
        match &self.api_token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError {
        var: "DEVBOARDS_PAGE_SIZE",
        value: raw.to_string(),
        reason,
    };
    let size: u32 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(invalid(format!("must be between 1 and {MAX_PAGE_SIZE}")));
    }
    Ok(size)
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError {
        var: "DEVBOARDS_REQUEST_TIMEOUT_SECS",
        value: raw.to_string(),
        reason: format!("{e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError {
            var: "DEVBOARDS_REQUEST_TIMEOUT_SECS",
            value: raw.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000/api");
        assert_eq!(config.api_token, None);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.locale_file, None);
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("DEVBOARDS_API_URL", "https://devboards.example/api"),
            ("DEVBOARDS_API_TOKEN", "abc"),
            ("DEVBOARDS_PAGE_SIZE", "50"),
            ("DEVBOARDS_REQUEST_TIMEOUT_SECS", " 5 "),
            ("DEVBOARDS_LOCALE_FILE", "locales/de.json"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "https://devboards.example/api");
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.locale_file, Some(PathBuf::from("locales/de.json")));

        let client = config.client_config();
        assert_eq!(client.token.as_deref(), Some("abc"));
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("DEVBOARDS_API_TOKEN", "  "), ("DEVBOARDS_PAGE_SIZE", "")]).unwrap();
        assert_eq!(config.api_token, None);
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_matches!(
            load(&[("DEVBOARDS_PAGE_SIZE", "twenty")]),
            Err(ConfigError { var: "DEVBOARDS_PAGE_SIZE", .. })
        );
        assert_matches!(
            load(&[("DEVBOARDS_PAGE_SIZE", "0")]),
            Err(ConfigError { var: "DEVBOARDS_PAGE_SIZE", .. })
        );
        assert_matches!(
            load(&[("DEVBOARDS_PAGE_SIZE", "101")]),
            Err(ConfigError { var: "DEVBOARDS_PAGE_SIZE", .. })
        );
        assert_matches!(
            load(&[("DEVBOARDS_REQUEST_TIMEOUT_SECS", "-1")]),
            Err(ConfigError { var: "DEVBOARDS_REQUEST_TIMEOUT_SECS", .. })
        );
    }
}
