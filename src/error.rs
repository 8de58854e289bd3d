//! Unified error types for the URL tracker.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the URL tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Token validator error.
    #[error("validator error: {0}")]
    Validator(#[from] ValidatorError),
}

/// Persistence gateway errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A non-deleted record with this target URL already exists.
    #[error("target url already tracked: {target_url}")]
    Duplicate {
        /// The conflicting target URL.
        target_url: String,
    },

    /// Schema name cannot be used in DDL.
    #[error("invalid schema name: {0}")]
    InvalidSchema(String),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Token validation errors.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// No validation endpoint is configured.
    #[error("token validation endpoint is not configured")]
    NotConfigured,

    /// Validation endpoint is not a usable URL.
    #[error("invalid validation url {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Endpoint could not be consulted.
    #[error("validation endpoint unavailable: {0}")]
    Unavailable(String),

    /// Outbound request failed (connect, timeout, TLS).
    #[error("validation request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors surfaced to HTTP clients. Each variant maps to exactly one status.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body could not be parsed as a track request.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// `target_url` was present but empty.
    #[error("target_url must not be empty")]
    EmptyTargetUrl,

    /// Authorization header absent or not a bearer credential.
    #[error("missing bearer token")]
    MissingCredentials,

    /// Validator rejected the token or could not be reached.
    #[error("invalid token")]
    InvalidToken,

    /// Target URL is already tracked.
    #[error("target url already tracked")]
    AlreadyTracked,

    /// No validator configured for an authenticated route.
    #[error("authentication is not configured")]
    AuthNotConfigured,

    /// Store lookup or write failed.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => ApiError::AlreadyTracked,
            other => ApiError::Store(other),
        }
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::EmptyTargetUrl => StatusCode::BAD_REQUEST,
            ApiError::MissingCredentials | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::AlreadyTracked => StatusCode::CONFLICT,
            ApiError::AuthNotConfigured | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message. Internal details stay in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::InvalidBody(_) => "Invalid request body",
            ApiError::EmptyTargetUrl => "target_url is required",
            ApiError::MissingCredentials => "Unauthorized",
            ApiError::InvalidToken => "Unauthorized",
            ApiError::AlreadyTracked => "URL already exists",
            ApiError::AuthNotConfigured => "Authentication is not configured",
            ApiError::Store(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(e) = &self {
            tracing::error!(error = %e, "store operation failed");
        }

        let body = Json(json!({
            "error": self.message(),
        }));

        (self.status(), body).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, TrackerError>;
