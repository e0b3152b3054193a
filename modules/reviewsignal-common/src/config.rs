use std::env;
use std::str::FromStr;

use tracing::info;
use url::Url;

use crate::error::ConfigurationError;
use crate::types::{DEFAULT_PREVIEW_CHARS, DEFAULT_TEXT_FIELD};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Persistence (optional)
    pub database_url: Option<String>,

    // Records
    pub text_field: String,
    pub preview_chars: usize,

    // Sources
    pub api_timeout_secs: u64,
    pub concurrent_sources: bool,

    // Reporting
    pub sample_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            text_field: DEFAULT_TEXT_FIELD.to_string(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            api_timeout_secs: 15,
            concurrent_sources: false,
            sample_size: 5,
        }
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if any).
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            text_field: lookup("REVIEWSIGNAL_TEXT_FIELD")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.text_field),
            preview_chars: parsed(&lookup, "REVIEWSIGNAL_PREVIEW_CHARS", defaults.preview_chars)?,
            api_timeout_secs: parsed(
                &lookup,
                "REVIEWSIGNAL_API_TIMEOUT_SECS",
                defaults.api_timeout_secs,
            )?,
            concurrent_sources: parsed(
                &lookup,
                "REVIEWSIGNAL_CONCURRENT_SOURCES",
                defaults.concurrent_sources,
            )?,
            sample_size: parsed(&lookup, "REVIEWSIGNAL_SAMPLE_SIZE", defaults.sample_size)?,
        })
    }

    /// `DATABASE_URL`, or an error naming it.
    pub fn require_database_url(&self) -> Result<&str, ConfigurationError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingEnv("DATABASE_URL".into()))
    }

    pub fn log_redacted(&self) {
        let database_url = self
            .database_url
            .as_deref()
            .map(redact_url)
            .unwrap_or_else(|| "<unset>".to_string());
        info!(
            database_url = %database_url,
            text_field = self.text_field.as_str(),
            preview_chars = self.preview_chars,
            api_timeout_secs = self.api_timeout_secs,
            concurrent_sources = self.concurrent_sources,
            sample_size = self.sample_size,
            "Config loaded"
        );
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigurationError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigurationError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// Mask the password in a connection URL. Anything that does not parse as a
/// URL is masked entirely.
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return "***".to_string();
    };
    if url.password().is_some() && url.set_password(Some("***")).is_err() {
        return "***".to_string();
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigurationError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(from_pairs(&[]).unwrap(), Config::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/reviews"),
            ("REVIEWSIGNAL_TEXT_FIELD", "body"),
            ("REVIEWSIGNAL_API_TIMEOUT_SECS", "3"),
            ("REVIEWSIGNAL_CONCURRENT_SOURCES", "true"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/reviews"));
        assert_eq!(config.text_field, "body");
        assert_eq!(config.api_timeout_secs, 3);
        assert!(config.concurrent_sources);
        assert_eq!(config.preview_chars, 100);
    }

    #[test]
    fn malformed_number_is_a_configuration_error() {
        let err = from_pairs(&[("REVIEWSIGNAL_PREVIEW_CHARS", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidValue {
                key: "REVIEWSIGNAL_PREVIEW_CHARS".into(),
                value: "lots".into()
            }
        );
    }

    #[test]
    fn missing_database_url_is_named() {
        let err = Config::default().require_database_url().unwrap_err();
        assert_eq!(err, ConfigurationError::MissingEnv("DATABASE_URL".into()));
    }

    #[test]
    fn redacts_password_only() {
        assert_eq!(
            redact_url("postgres://app:hunter2@db:5432/reviews"),
            "postgres://app:***@db:5432/reviews"
        );
        assert_eq!(redact_url("postgres://db/reviews"), "postgres://db/reviews");
    }

    #[test]
    fn password_containing_at_sign_is_fully_masked() {
        let redacted = redact_url("postgres://app:p@ss@db:5432/reviews");
        assert_eq!(redacted, "postgres://app:***@db:5432/reviews");
        assert!(!redacted.contains("ss@"));
    }

    #[test]
    fn at_sign_in_query_leaves_url_intact() {
        let url = "postgres://db:5432/reviews?application_name=me@host";
        assert_eq!(redact_url(url), url);
    }

    #[test]
    fn unparseable_url_is_masked_entirely() {
        assert_eq!(redact_url("not a url with secret"), "***");
    }
}
