use std::time::Duration;

use crate::error::{FairlensError, Result};

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "FAIRLENS_API_URL";

/// Base URL used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Configuration for the analysis backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    endpoint: String,
    timeout: Duration,
    label_col: String,
    tool: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl BackendConfig {
    /// Create a configuration for the backend at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.into()),
            timeout: Duration::from_secs(120),
            label_col: "response".to_string(),
            tool: "giskard".to_string(),
        }
    }

    /// Create a configuration from `FAIRLENS_API_URL`, falling back to the default endpoint.
    pub fn from_env() -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    /// Set a custom API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = normalize_endpoint(endpoint.into());
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the label column sent with fairness checks.
    pub fn with_label_col(mut self, label_col: impl Into<String>) -> Self {
        self.label_col = label_col.into();
        self
    }

    /// Set the analysis tool sent with fairness checks.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Get the API endpoint (no trailing slash).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the HTTP request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the default label column.
    pub fn label_col(&self) -> &str {
        &self.label_col
    }

    /// Get the default analysis tool.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Checks that the endpoint is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::Configuration`] otherwise.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            FairlensError::Configuration(format!("Invalid backend endpoint '{}': {e}", self.endpoint))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(FairlensError::Configuration(format!(
                "Unsupported backend endpoint scheme '{scheme}'"
            ))),
        }
    }

    /// Full URL of an endpoint path such as `/upload`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }
}

fn normalize_endpoint(endpoint: String) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.endpoint(), "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.label_col(), "response");
        assert_eq!(config.tool(), "giskard");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_trailing_slash() {
        let config = BackendConfig::new("https://fair.example.com/api/")
            .with_timeout(Duration::from_secs(5))
            .with_label_col("outcome")
            .with_tool("fairlearn");
        assert_eq!(config.endpoint(), "https://fair.example.com/api");
        assert_eq!(config.url("/upload"), "https://fair.example.com/api/upload");
        assert_eq!(config.label_col(), "outcome");
        assert_eq!(config.tool(), "fairlearn");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            BackendConfig::new("not a url").validate(),
            Err(FairlensError::Configuration(_))
        ));
        assert!(BackendConfig::new("ftp://host").validate().is_err());
    }
}
