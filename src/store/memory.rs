//! In-process document store.

use super::{DocumentStore, StoreSession};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collection {
    order: Vec<String>,
    docs: HashMap<String, Value>,
}

type Collections = Arc<RwLock<HashMap<String, Collection>>>;

/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Collections,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn session(&self, collection: &str) -> Result<Box<dyn StoreSession>, AppError> {
        Ok(Box::new(MemorySession {
            collections: self.collections.clone(),
            name: collection.to_string(),
        }))
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), AppError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) {}
}

struct MemorySession {
    collections: Collections,
    name: String,
}

impl MemorySession {
    fn not_found(&self, id: &str) -> AppError {
        AppError::NotFound(format!("{}/{}", self.name, id))
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert(&mut self, id: &str, doc: &Value) -> Result<(), AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.entry(self.name.clone()).or_default();
        if coll.docs.contains_key(id) {
            return Err(AppError::Internal(format!("duplicate id {} in {}", id, self.name)));
        }
        coll.order.push(id.to_string());
        coll.docs.insert(id.to_string(), doc.clone());
        Ok(())
    }

    async fn find_id(&mut self, id: &str) -> Result<Value, AppError> {
        let guard = self.collections.read().await;
        guard
            .get(&self.name)
            .and_then(|c| c.docs.get(id))
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    async fn update_id(&mut self, id: &str, fields: &Value) -> Result<Value, AppError> {
        let mut guard = self.collections.write().await;
        let stored = guard
            .get_mut(&self.name)
            .and_then(|c| c.docs.get_mut(id))
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", self.name, id)))?;
        merge_fields(stored, fields);
        Ok(stored.clone())
    }

    async fn remove_id(&mut self, id: &str) -> Result<(), AppError> {
        let mut guard = self.collections.write().await;
        let coll = guard.get_mut(&self.name).ok_or_else(|| self.not_found(id))?;
        if coll.docs.remove(id).is_none() {
            return Err(self.not_found(id));
        }
        coll.order.retain(|k| k != id);
        Ok(())
    }

    async fn find_all(&mut self) -> Result<Vec<Value>, AppError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&self.name)
            .map(|c| c.order.iter().filter_map(|id| c.docs.get(id).cloned()).collect())
            .unwrap_or_default())
    }
}

/// Same shape as JSONB `doc || fields`: top-level keys of `fields` overwrite.
fn merge_fields(stored: &mut Value, fields: &Value) {
    match (stored, fields) {
        (Value::Object(target), Value::Object(src)) => {
            for (k, v) in src {
                target.insert(k.clone(), v.clone());
            }
        }
        (stored, fields) => *stored = fields.clone(),
    }
}
