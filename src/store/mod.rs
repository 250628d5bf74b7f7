//! Document store seam: a shared store hands out per-request sessions bound to one collection.
//!
//! `PgDocumentStore` keeps each collection in a PostgreSQL table of JSONB documents;
//! `MemoryStore` keeps everything in process and is what the tests run against.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::{ensure_database_exists, PgDocumentStore};

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Shared database handle. One per [`crate::Library`].
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Opens a session on `collection`. Dropping the session releases it.
    async fn session(&self, collection: &str) -> Result<Box<dyn StoreSession>, AppError>;

    /// Creates the collection if it does not exist yet.
    async fn ensure_collection(&self, collection: &str) -> Result<(), AppError>;

    /// Round-trip used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;

    async fn close(&self);
}

/// One request's view of a collection. Every call is a single round-trip.
///
/// Missing documents are reported as errors for which [`AppError::is_not_found`] is true.
#[async_trait]
pub trait StoreSession: Send {
    async fn insert(&mut self, id: &str, doc: &Value) -> Result<(), AppError>;

    async fn find_id(&mut self, id: &str) -> Result<Value, AppError>;

    /// Sets the top-level fields of `fields` on the stored document and returns the result.
    async fn update_id(&mut self, id: &str, fields: &Value) -> Result<Value, AppError>;

    async fn remove_id(&mut self, id: &str) -> Result<(), AppError>;

    /// All documents in creation order.
    async fn find_all(&mut self) -> Result<Vec<Value>, AppError>;
}
