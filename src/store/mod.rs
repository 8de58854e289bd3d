//! Persistence gateway for tracked URLs.
//!
//! This module handles:
//! - The [`TrackedUrlStore`] trait the HTTP layer depends on
//! - A Postgres implementation backed by sqlx
//! - An in-memory implementation for tests and local runs

pub mod memory;
pub mod postgres;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use types::TrackedUrl;

/// Lookup and insert over the set of tracked URLs.
///
/// No update or delete is exposed. `insert` is the enforcement
/// point for uniqueness: implementations must return
/// [`StoreError::Duplicate`] when a live record with the same target URL
/// exists at write time, regardless of any earlier lookup.
#[async_trait]
pub trait TrackedUrlStore: Send + Sync + 'static {
    /// Find the live record whose target URL matches exactly.
    async fn find_by_target_url(&self, target_url: &str) -> Result<Option<TrackedUrl>, StoreError>;

    /// Insert a new record and return it.
    async fn insert(&self, target_url: &str) -> Result<TrackedUrl, StoreError>;
}
