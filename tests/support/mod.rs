//! Shared test doubles.
#![allow(dead_code)]

use async_trait::async_trait;
use docrest::{AppError, DocumentStore, StoreSession};
use serde_json::Value;

/// Store whose sessions fail every call with a driver error and whose ping fails.
pub struct BrokenStore;

struct BrokenSession;

fn pool_timeout() -> AppError {
    AppError::Db(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn session(&self, _collection: &str) -> Result<Box<dyn StoreSession>, AppError> {
        Ok(Box::new(BrokenSession))
    }

    async fn ensure_collection(&self, _collection: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Err(pool_timeout())
    }

    async fn close(&self) {}
}

#[async_trait]
impl StoreSession for BrokenSession {
    async fn insert(&mut self, _id: &str, _doc: &Value) -> Result<(), AppError> {
        Err(pool_timeout())
    }

    async fn find_id(&mut self, _id: &str) -> Result<Value, AppError> {
        Err(pool_timeout())
    }

    async fn update_id(&mut self, _id: &str, _fields: &Value) -> Result<Value, AppError> {
        Err(pool_timeout())
    }

    async fn remove_id(&mut self, _id: &str) -> Result<(), AppError> {
        Err(pool_timeout())
    }

    async fn find_all(&mut self) -> Result<Vec<Value>, AppError> {
        Err(pool_timeout())
    }
}
