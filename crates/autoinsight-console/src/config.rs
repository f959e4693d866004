use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the backend HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the analysis service (scheme, host and port).
    pub base_url: String,
    /// Overall HTTP timeout. Agent runs are slow, so the default is generous.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `AUTOINSIGHT_BASE_URL` and `AUTOINSIGHT_TIMEOUT_SECS`.
    ///
    /// Unset variables fall back to defaults; a timeout that is not a positive
    /// integer is a config error.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("AUTOINSIGHT_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_string();
        }
        if let Ok(raw) = std::env::var("AUTOINSIGHT_TIMEOUT_SECS") {
            config.timeout = parse_timeout_secs(&raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base url must start with http:// or https:// (got {url:?})"
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ClientError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClientError::Config(format!(
            "AUTOINSIGHT_TIMEOUT_SECS must be a positive integer (got {raw:?})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(
            config.endpoint("/database_query"),
            "http://localhost:8000/database_query"
        );
        assert_eq!(
            config.endpoint("list_files"),
            "http://localhost:8000/list_files"
        );
    }

    #[test]
    fn validate_rejects_non_http_urls_and_zero_timeout() {
        assert!(ClientConfig::new("ftp://x").validate().is_err());
        assert!(
            ClientConfig::default()
                .timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn timeout_parsing() {
        assert_eq!(parse_timeout_secs(" 30 "), Ok(Duration::from_secs(30)));
        assert!(matches!(
            parse_timeout_secs("0"),
            Err(ClientError::Config(_))
        ));
        assert!(parse_timeout_secs("soon").is_err());
    }
}
