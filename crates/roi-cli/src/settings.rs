//! Connection settings read from the environment

use reqwest::Url;
use roi_client::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_TIMEOUT};
use std::time::Duration;

pub(crate) const URL_VAR: &str = "RUNDECK_URL";
pub(crate) const TOKEN_VAR: &str = "RUNDECK_API_TOKEN";
pub(crate) const API_VERSION_VAR: &str = "RUNDECK_API_VERSION";
pub(crate) const TIMEOUT_VAR: &str = "RUNDECK_TIMEOUT_SECS";

/// Missing or malformed configuration
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("Rundeck URL not set; please set the RUNDECK_URL environment variable")]
    MissingUrl,

    #[error("API token not set; please set the RUNDECK_API_TOKEN environment variable")]
    MissingToken,

    #[error("invalid Rundeck URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) url: Url,
    pub(crate) token: String,
    pub(crate) api_version: u32,
    pub(crate) timeout: Duration,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup; blank values count as unset
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let raw_url = var(URL_VAR).ok_or(ConfigError::MissingUrl)?;
        let url = parse_url(&raw_url)?;
        let token = var(TOKEN_VAR).ok_or(ConfigError::MissingToken)?;

        let api_version = match var(API_VERSION_VAR) {
            Some(value) => parse_positive(API_VERSION_VAR, &value)?,
            None => DEFAULT_API_VERSION,
        };
        let timeout = match var(TIMEOUT_VAR) {
            Some(value) => Duration::from_secs(parse_positive(TIMEOUT_VAR, &value)?.into()),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            url,
            token,
            api_version,
            timeout,
        })
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.url.clone(), self.token.clone())
            .with_api_version(self.api_version)
            .with_timeout(self.timeout)
    }
}

/// Accept only absolute http(s) URLs with a host
fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

fn parse_positive(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            (URL_VAR, "https://rundeck.example.com"),
            (TOKEN_VAR, "abc"),
        ]))
        .unwrap();

        assert_eq!(settings.url.as_str(), "https://rundeck.example.com/");
        assert_eq!(settings.token, "abc");
        assert_eq!(settings.api_version, 46);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_values_are_trimmed() {
        let settings = Settings::from_lookup(lookup(&[
            (URL_VAR, "  http://localhost:4440 \n"),
            (TOKEN_VAR, " abc "),
            (API_VERSION_VAR, "41"),
            (TIMEOUT_VAR, " 5 "),
        ]))
        .unwrap();

        assert_eq!(settings.url.port(), Some(4440));
        assert_eq!(settings.token, "abc");
        assert_eq!(settings.api_version, 41);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_url() {
        let err = Settings::from_lookup(lookup(&[(TOKEN_VAR, "abc")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingUrl);

        let err =
            Settings::from_lookup(lookup(&[(URL_VAR, "   "), (TOKEN_VAR, "abc")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingUrl);
    }

    #[test]
    fn test_missing_token() {
        let err = Settings::from_lookup(lookup(&[(URL_VAR, "http://localhost")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn test_invalid_urls() {
        let rejected = [
            "rundeck.example.com",
            "localhost:4440",
            "ftp://rundeck.example.com",
            "http://",
        ];
        for raw in rejected {
            let err =
                Settings::from_lookup(lookup(&[(URL_VAR, raw), (TOKEN_VAR, "abc")])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidUrl { .. }),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_invalid_numbers() {
        let err = Settings::from_lookup(lookup(&[
            (URL_VAR, "http://localhost"),
            (TOKEN_VAR, "abc"),
            (TIMEOUT_VAR, "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: TIMEOUT_VAR,
                value: "soon".into()
            }
        );

        let err = Settings::from_lookup(lookup(&[
            (URL_VAR, "http://localhost"),
            (TOKEN_VAR, "abc"),
            (API_VERSION_VAR, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: API_VERSION_VAR, .. }));
    }

    #[test]
    fn test_client_config_carries_settings() {
        let settings = Settings::from_lookup(lookup(&[
            (URL_VAR, "http://localhost:4440"),
            (TOKEN_VAR, "abc"),
            (TIMEOUT_VAR, "7"),
        ]))
        .unwrap();

        let config = settings.client_config();
        assert_eq!(config.base_url, settings.url);
        assert_eq!(config.token, "abc");
        assert_eq!(config.timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_error_messages_name_the_variable() {
        assert!(ConfigError::MissingUrl.to_string().contains("RUNDECK_URL"));
        assert!(ConfigError::MissingToken.to_string().contains("RUNDECK_API_TOKEN"));
    }
}
