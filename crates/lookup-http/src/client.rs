//! JSON-over-HTTP endpoint client

use crate::error::{HttpError, HttpResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Absolute http(s) URL receiving POSTed JSON
    pub url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Transport timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl EndpointConfig {
    /// Create config for `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// With bearer token
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// With transport timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }
}

/// Validate an endpoint URL
///
/// # Errors
/// `HttpError::InvalidEndpoint` for unparsable URLs, non-http schemes or
/// embedded credentials
pub fn parse_endpoint(raw: &str) -> HttpResult<Url> {
    let url = Url::parse(raw).map_err(|e| HttpError::InvalidEndpoint(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(HttpError::InvalidEndpoint(format!("unsupported scheme: {other}")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(HttpError::InvalidEndpoint(
            "endpoint must not include credentials".into(),
        ));
    }
    Ok(url)
}

/// Client POSTing JSON to one endpoint
#[derive(Clone)]
pub struct JsonEndpoint {
    url: Url,
    http: Client,
}

impl std::fmt::Debug for JsonEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEndpoint")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl JsonEndpoint {
    /// Build client for `config`
    ///
    /// # Errors
    /// Invalid URL or API key, or client construction failure
    pub fn new(config: &EndpointConfig) -> HttpResult<Self> {
        let url = parse_endpoint(&config.url)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| HttpError::InvalidEndpoint(format!("invalid api key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lookup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { url, http })
    }

    /// Endpoint URL
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// POST `body`; `None` when the endpoint answers 404
    ///
    /// # Errors
    /// Transport failure, non-success status or non-JSON body
    pub async fn post(&self, body: &Value) -> HttpResult<Option<Value>> {
        let response = self.http.post(self.url.clone()).json(body).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!("{} returned {}", self.url, status);
            return Err(HttpError::Status {
                status: status.as_u16(),
            });
        }
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| HttpError::malformed(e.to_string()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        let err = parse_endpoint("ftp://example.com/resolve").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_credentials() {
        assert!(parse_endpoint("https://user:pw@example.com/resolve").is_err());
    }

    #[test]
    fn accepts_https() {
        let url = parse_endpoint("https://example.com/v1/resolve").unwrap();
        assert_eq!(url.path(), "/v1/resolve");
    }

    #[test]
    fn config_defaults_from_json() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{"url": "http://localhost:8080/resolve"}"#).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn builds_client_with_api_key() {
        let config = EndpointConfig::new("http://localhost:8080/resolve").with_api_key("secret");
        let endpoint = JsonEndpoint::new(&config).unwrap();
        assert_eq!(endpoint.url().port(), Some(8080));
    }
}
