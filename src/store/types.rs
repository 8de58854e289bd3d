//! Tracked URL record type.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A persisted target URL.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TrackedUrl {
    /// Store-assigned identifier.
    pub id: i64,
    /// The tracked URL, stored exactly as submitted.
    pub target_url: String,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker. Never set by this service.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TrackedUrl {
    /// Whether the record counts toward the uniqueness invariant.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
