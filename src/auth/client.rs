//! HTTP token validator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::ValidatorError;
use crate::metrics;

use super::{TokenStatus, TokenValidator};

/// Default outbound timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Validates tokens with `GET <url>` and `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct HttpTokenValidator {
    /// HTTP client for validation requests.
    http: reqwest::Client,
    /// Validation endpoint.
    url: url::Url,
}

impl HttpTokenValidator {
    /// Create a validator for `url` with the given request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ValidatorError> {
        let parsed = url::Url::parse(url).map_err(|e| ValidatorError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidatorError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            // Only a direct 200 counts; a 3xx is returned as-is.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { http, url: parsed })
    }

    /// Build from config. Fails with `NotConfigured` when the URL is unset.
    pub fn from_config(config: &Config) -> Result<Self, ValidatorError> {
        match config.token_validation_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Self::new(url, config.validation_timeout()),
            _ => Err(ValidatorError::NotConfigured),
        }
    }

    /// Validation endpoint.
    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    #[instrument(skip(self, token), fields(endpoint = %self.url))]
    async fn validate(&self, token: &str) -> Result<TokenStatus, ValidatorError> {
        let start = Instant::now();

        let result = self
            .http
            .get(self.url.clone())
            .bearer_auth(token)
            .send()
            .await;

        metrics::record_token_validation_latency(start);

        let response = result.map_err(|e| {
            warn!(error = %e, "token validation request failed");
            e
        })?;

        let status = response.status();
        debug!(status = %status, "token validation responded");

        if status == StatusCode::OK {
            Ok(TokenStatus::Valid)
        } else {
            Ok(TokenStatus::Invalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderMap;
    use axum::response::Redirect;
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    /// Spawn a fake validator that accepts `Bearer good` and answers 503
    /// for `Bearer flaky`.
    async fn spawn_validator() -> String {
        async fn check(headers: HeaderMap) -> axum::http::StatusCode {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer good") => axum::http::StatusCode::OK,
                Some("Bearer flaky") => axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Some("Bearer created") => axum::http::StatusCode::CREATED,
                _ => axum::http::StatusCode::UNAUTHORIZED,
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/validate", get(check))
            .route("/redirect", get(|| async { Redirect::temporary("/login") }))
            .route("/login", get(|| async { "please log in" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/validate", addr)
    }

    #[test]
    fn new_rejects_bad_urls() {
        assert!(matches!(
            HttpTokenValidator::new("nope", DEFAULT_TIMEOUT),
            Err(ValidatorError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpTokenValidator::new("ftp://auth.example.com", DEFAULT_TIMEOUT),
            Err(ValidatorError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn from_config_requires_url() {
        let config = Config::default();
        assert!(matches!(
            HttpTokenValidator::from_config(&config),
            Err(ValidatorError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn only_exact_200_is_valid() {
        let url = spawn_validator().await;
        let validator = HttpTokenValidator::new(&url, DEFAULT_TIMEOUT).unwrap();

        assert_eq!(validator.validate("good").await.unwrap(), TokenStatus::Valid);
        assert_eq!(validator.validate("bad").await.unwrap(), TokenStatus::Invalid);
        assert_eq!(validator.validate("flaky").await.unwrap(), TokenStatus::Invalid);
        assert_eq!(validator.validate("created").await.unwrap(), TokenStatus::Invalid);
    }

    #[tokio::test]
    async fn redirect_to_200_is_invalid() {
        let url = spawn_validator().await.replace("/validate", "/redirect");
        let validator = HttpTokenValidator::new(&url, DEFAULT_TIMEOUT).unwrap();

        assert_eq!(
            validator.validate("garbage-token").await.unwrap(),
            TokenStatus::Invalid
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let validator =
            HttpTokenValidator::new(&format!("http://{}/validate", addr), Duration::from_secs(1))
                .unwrap();

        assert!(matches!(
            validator.validate("good").await,
            Err(ValidatorError::Request(_))
        ));
    }
}
