//! Mock token validator for unit testing.
//!
//! This module provides a validator that never touches the network and
//! records how many times it was consulted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ValidatorError;

use super::{TokenStatus, TokenValidator};

/// Mock validator with a fixed set of accepted tokens.
#[derive(Debug, Clone, Default)]
pub struct MockTokenValidator {
    /// Tokens answered with `Valid`.
    valid: Arc<Mutex<HashSet<String>>>,
    /// Simulate a network failure on every call.
    unreachable: bool,
    /// Number of `validate` calls observed.
    calls: Arc<AtomicUsize>,
}

impl MockTokenValidator {
    /// Create a mock that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock accepting exactly `tokens`.
    pub fn accepting<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for token in tokens {
            mock.allow(token);
        }
        mock
    }

    /// Create a mock whose every call fails as if the endpoint were down.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Accept `token` from now on.
    pub fn allow(&self, token: impl Into<String>) {
        self.valid
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.into());
    }

    /// Number of validation calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, token: &str) -> Result<TokenStatus, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unreachable {
            return Err(ValidatorError::Unavailable("mock endpoint down".to_string()));
        }

        let valid = self
            .valid
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token);

        Ok(if valid {
            TokenStatus::Valid
        } else {
            TokenStatus::Invalid
        })
    }
}
