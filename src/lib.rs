//! URL tracker service.
//!
//! Records target URLs submitted by authenticated clients and rejects
//! duplicates.
//!
//! # Request flow
//!
//! ```text
//! POST /track/ ──► auth gate ──► track handler ──► store
//!                  │                │
//!                  │ 401            ├─ 400 malformed / empty target_url
//!                  │ 500 no         ├─ 409 already tracked
//!                  │     validator  └─ 201 created
//!                  ▼
//!          external validator (GET, Bearer, 5s)
//! ```
//!
//! Uniqueness is enforced by the store at insert time. The handler's
//! lookup only short-circuits the common duplicate case.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Persistence gateway (Postgres and in-memory)
//! - [`auth`]: Bearer token validation
//! - [`api`]: HTTP routes, handlers and the auth gate
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{Result, TrackerError};
