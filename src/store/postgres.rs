//! Postgres-backed tracked URL store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::{debug, info, instrument, warn};

use crate::config::{is_sql_identifier, Config};
use crate::error::StoreError;
use crate::metrics;

use super::{TrackedUrl, TrackedUrlStore};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Tracked URLs in `<schema>.tracked_urls`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
    table: String,
    schema: String,
}

impl PostgresStore {
    /// Connect using the `DB_*` settings and create the table if needed.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let mut opts = PgConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .database(&config.db_name);

        if let Some(password) = &config.db_password {
            opts = opts.password(password);
        }

        info!(
            host = %config.db_host,
            port = config.db_port,
            database = %config.db_name,
            username = %config.db_user,
            schema = %config.db_schema,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(opts)
            .await?;

        let store = Self::from_pool(pool, &config.db_schema)?;
        store.migrate().await?;

        Ok(store)
    }

    /// Wrap an existing pool. Does not touch the database.
    pub fn from_pool(pool: Pool<Postgres>, schema: &str) -> Result<Self, StoreError> {
        if !is_sql_identifier(schema) {
            return Err(StoreError::InvalidSchema(schema.to_string()));
        }

        Ok(Self {
            pool,
            table: format!("\"{}\".tracked_urls", schema),
            schema: schema.to_string(),
        })
    }

    /// Create the schema, table and partial unique index if absent.
    #[instrument(skip(self), fields(schema = %self.schema))]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in self.schema_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        debug!("schema ready");
        Ok(())
    }

    fn schema_statements(&self) -> Vec<String> {
        vec![
            format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    target_url TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    deleted_at TIMESTAMPTZ
                )",
                self.table
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS tracked_urls_target_url_live_idx
                    ON {} (target_url) WHERE deleted_at IS NULL",
                self.table
            ),
        ]
    }
}

#[async_trait]
impl TrackedUrlStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_target_url(&self, target_url: &str) -> Result<Option<TrackedUrl>, StoreError> {
        let _timer = metrics::timer_store_operation("find");

        let sql = format!(
            "SELECT id, target_url, created_at, deleted_at FROM {}
             WHERE target_url = $1 AND deleted_at IS NULL",
            self.table
        );

        let row = sqlx::query_as::<_, TrackedUrl>(&sql)
            .bind(target_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn insert(&self, target_url: &str) -> Result<TrackedUrl, StoreError> {
        let _timer = metrics::timer_store_operation("insert");

        let sql = format!(
            "INSERT INTO {} (target_url) VALUES ($1)
             RETURNING id, target_url, created_at, deleted_at",
            self.table
        );

        let result = sqlx::query_as::<_, TrackedUrl>(&sql)
            .bind(target_url)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                warn!("insert lost race on unique target_url");
                Err(StoreError::Duplicate {
                    target_url: target_url.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
