//! PostgreSQL as a document store: one table per collection, documents in a JSONB column.

use super::{DocumentStore, StoreSession};
use crate::config::DialInfo;
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{ConnectOptions, PgPool, Postgres};
use std::str::FromStr;

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn connect_options(dial: &DialInfo) -> Result<PgConnectOptions, AppError> {
    let opts = PgConnectOptions::from_str(&dial.url).map_err(|e| ConfigError::Dial {
        name: "url",
        reason: e.to_string(),
    })?;
    Ok(match &dial.database {
        Some(db) => opts.database(db),
        None => opts,
    })
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Dials the server described by `dial` and builds the shared pool.
    pub async fn connect(dial: &DialInfo) -> Result<Self, AppError> {
        dial.validate()?;
        let opts = connect_options(dial)?;
        let pool = PgPoolOptions::new()
            .max_connections(dial.max_connections)
            .acquire_timeout(dial.timeout)
            .connect_with(opts)
            .await?;
        tracing::info!(max_connections = dial.max_connections, "connected to document database");
        Ok(PgDocumentStore { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgDocumentStore { pool }
    }

    /// The shared pool, for callers that want to tune or query it directly.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn session(&self, collection: &str) -> Result<Box<dyn StoreSession>, AppError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession {
            conn,
            table: quote_ident(collection),
        }))
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), AppError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            quote_ident(collection)
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Holds one pooled connection; returned to the pool on drop.
struct PgSession {
    conn: PoolConnection<Postgres>,
    table: String,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn insert(&mut self, id: &str, doc: &Value) -> Result<(), AppError> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(doc))
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn find_id(&mut self, id: &str) -> Result<Value, AppError> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        let Json(doc) = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(doc)
    }

    async fn update_id(&mut self, id: &str, fields: &Value) -> Result<Value, AppError> {
        let sql = format!(
            "UPDATE {} SET doc = doc || $2, updated_at = NOW() WHERE id = $1 RETURNING doc",
            self.table
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let Json(doc) = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .bind(Json(fields))
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(doc)
    }

    async fn remove_id(&mut self, id: &str) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.conn).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Db(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn find_all(&mut self) -> Result<Vec<Value>, AppError> {
        let sql = format!("SELECT doc FROM {} ORDER BY created_at, id", self.table);
        tracing::debug!(sql = %sql, "query");
        let rows = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }
}

/// Creates the database named by `dial` (or its URL) when it does not exist yet.
pub async fn ensure_database_exists(dial: &DialInfo) -> Result<(), AppError> {
    let opts = connect_options(dial)?;
    let db_name = match opts.get_database() {
        Some(name) if !name.is_empty() && name != "postgres" => name.to_string(),
        _ => return Ok(()),
    };
    let mut conn = opts.clone().database("postgres").connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("books"), "\"books\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn database_override_wins() {
        let dial = DialInfo::new("postgres://localhost:5432/from_url").database("my_store");
        let opts = connect_options(&dial).unwrap();
        assert_eq!(opts.get_database(), Some("my_store"));
    }

    #[test]
    fn bad_url_is_a_config_error() {
        let dial = DialInfo::new("not a url");
        assert!(matches!(connect_options(&dial), Err(AppError::Config(ConfigError::Dial { .. }))));
    }
}
