//! Bearer token validation against an external service.
//!
//! This module handles:
//! - The [`TokenValidator`] capability injected into the auth gate
//! - An HTTP implementation that calls the configured endpoint
//! - A mock implementation for tests

pub mod client;
pub mod mock;

use async_trait::async_trait;

use crate::error::ValidatorError;

pub use client::HttpTokenValidator;
pub use mock::MockTokenValidator;

/// Outcome of a validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// The remote service accepted the token.
    Valid,
    /// The remote service answered with anything but 200.
    Invalid,
}

impl TokenStatus {
    /// True for [`TokenStatus::Valid`].
    pub fn is_valid(self) -> bool {
        matches!(self, TokenStatus::Valid)
    }
}

/// Decides whether a bearer token is acceptable.
#[async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a non-empty bearer token. No caching, no retries.
    async fn validate(&self, token: &str) -> Result<TokenStatus, ValidatorError>;
}
