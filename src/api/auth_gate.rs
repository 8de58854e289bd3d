//! Bearer token gate for the `/track` routes.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::error::{ApiError, ValidatorError};
use crate::metrics;

use super::handlers::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token after `Bearer `. The prefix is case-sensitive and the
/// remainder must be non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingCredentials)?
        .to_str()
        .map_err(|_| ApiError::MissingCredentials)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(ApiError::MissingCredentials)?;

    if token.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    Ok(token)
}

/// Validate the caller's token before the request reaches the handler.
///
/// Every request makes a fresh call to the validator.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).map_err(|e| {
        metrics::inc_auth_rejection("malformed_header");
        warn!(path = %request.uri().path(), "rejecting request without usable bearer token");
        e
    })?;

    let Some(validator) = state.validator.as_ref() else {
        metrics::inc_auth_rejection("not_configured");
        error!("token validator is not configured");
        return Err(ApiError::AuthNotConfigured);
    };

    let outcome = validator.validate(token).await;
    match outcome {
        Ok(status) if status.is_valid() => {
            debug!("token accepted");
            Ok(next.run(request).await)
        }
        Ok(_) => {
            metrics::inc_auth_rejection("invalid_token");
            warn!("token rejected by validator");
            Err(ApiError::InvalidToken)
        }
        Err(ValidatorError::NotConfigured) => {
            metrics::inc_auth_rejection("not_configured");
            error!("token validator is not configured");
            Err(ApiError::AuthNotConfigured)
        }
        Err(e) => {
            metrics::inc_auth_rejection("validator_error");
            warn!(error = %e, "token validation failed");
            Err(ApiError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token_after_prefix() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(ApiError::MissingCredentials)
        ));
    }

    #[test]
    fn non_bearer_schemes_are_rejected() {
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(ApiError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("bearer abc")),
            Err(ApiError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(ApiError::MissingCredentials)
        ));
    }

    #[test]
    fn prefix_only_header_is_invalid() {
        // HeaderValue trims nothing, so the trailing space survives.
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(ApiError::InvalidToken)
        ));
    }
}
