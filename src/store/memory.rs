//! In-memory tracked URL store.
//!
//! Used by the router tests and by `--storage memory` for local runs
//! without a database.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::StoreError;

use super::{TrackedUrl, TrackedUrlStore};

/// Concurrent map keyed by target URL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<DashMap<String, TrackedUrl>>,
    next_id: Arc<AtomicI64>,
    unavailable: bool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every operation fails, for exercising 500 paths.
    pub fn failing() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.rows.iter().filter(|r| r.is_live()).count()
    }

    /// True if no live records exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the record for `target_url`, if any.
    pub fn get(&self, target_url: &str) -> Option<TrackedUrl> {
        self.rows.get(target_url).map(|r| r.clone())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackedUrlStore for InMemoryStore {
    async fn find_by_target_url(&self, target_url: &str) -> Result<Option<TrackedUrl>, StoreError> {
        self.check_available()?;
        Ok(self.rows.get(target_url).filter(|r| r.is_live()).map(|r| r.clone()))
    }

    async fn insert(&self, target_url: &str) -> Result<TrackedUrl, StoreError> {
        self.check_available()?;

        // Entry holds the shard lock, so check and insert are one step.
        match self.rows.entry(target_url.to_string()) {
            Entry::Occupied(existing) if existing.get().is_live() => Err(StoreError::Duplicate {
                target_url: target_url.to_string(),
            }),
            entry => {
                let row = TrackedUrl {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                    target_url: target_url.to_string(),
                    created_at: Utc::now(),
                    deleted_at: None,
                };
                entry.insert(row.clone());
                debug!(id = row.id, "inserted tracked url");
                Ok(row)
            }
        }
    }
}
