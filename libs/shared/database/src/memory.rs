use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::store::{
    into_object, is_server_timestamp, Document, DocumentStore, Filter, StoreError, StoreResult,
    WriteBatch, WriteOp,
};

/// In-process document store. Backs local development and the test suites;
/// documents keep their insertion order and batches apply atomically.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unavailable: AtomicBool,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Writes fail with `Rejected` while set; reads keep working.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub async fn insert(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        self.set(collection, id, fields, false).await
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<()> {
        self.check_available()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("memory store is read-only".to_string()));
        }
        Ok(())
    }

    fn stamp(mut fields: Map<String, Value>) -> Map<String, Value> {
        let now = Value::String(Utc::now().to_rfc3339());
        for value in fields.values_mut() {
            if is_server_timestamp(value) {
                *value = now.clone();
            }
        }
        fields.remove("id");
        fields
    }

    fn apply(collections: &mut HashMap<String, Vec<Document>>, op: WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::Set { collection, id, fields, merge } => {
                let fields = Self::stamp(fields);
                let docs = collections.entry(collection).or_default();
                match docs.iter_mut().find(|doc| doc.id == id) {
                    Some(existing) if merge => existing.fields.extend(fields),
                    Some(existing) => existing.fields = fields,
                    None => docs.push(Document::new(id, fields)),
                }
                Ok(())
            }
            WriteOp::Update { collection, id, fields } => {
                let fields = Self::stamp(fields);
                let existing = collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
                    .ok_or_else(|| StoreError::NotFound { collection: collection.clone(), id: id.clone() })?;
                existing.fields.extend(fields);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.check_available()?;
        debug!("Memory query on {} with {:?}", collection, filter);
        let collections = self.collections.read().await;
        let matches = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(&doc.fields, &doc.id))
                    .take(filter.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    async fn set(&self, collection: &str, id: &str, fields: Value, merge: bool) -> StoreResult<()> {
        self.check_writable()?;
        let fields = into_object(fields)?;
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            WriteOp::Set { collection: collection.to_string(), id: id.to_string(), fields, merge },
        )
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        self.check_writable()?;
        let fields = into_object(fields)?;
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            WriteOp::Update { collection: collection.to_string(), id: id.to_string(), fields },
        )
    }

    async fn add(&self, collection: &str, fields: Value) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, fields, false).await?;
        Ok(id)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.check_writable()?;
        let mut collections = self.collections.write().await;

        // All update targets must exist before anything is applied.
        for op in batch.ops() {
            if let WriteOp::Update { collection, id, .. } = op {
                let exists = collections
                    .get(collection)
                    .map(|docs| docs.iter().any(|doc| &doc.id == id))
                    .unwrap_or(false);
                if !exists {
                    return Err(StoreError::NotFound { collection: collection.clone(), id: id.clone() });
                }
            }
        }

        for op in batch.into_ops() {
            Self::apply(&mut collections, op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{server_timestamp, SERVER_TIMESTAMP};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_and_merge() {
        let store = MemoryStore::new();
        store.set("users", "u1", json!({ "name": "Ada", "role": "Patient" }), false).await.unwrap();
        store.set("users", "u1", json!({ "name": "Ada L." }), true).await.unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Ada L.")));
        assert_eq!(doc.get("role"), Some(&json!("Patient")));

        store.set("users", "u1", json!({ "name": "Replaced" }), false).await.unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("role"), None);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let result = store.update("appointments", "nope", json!({ "status": "Completed" })).await;
        assert_matches!(result, Err(StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_timestamp_is_resolved() {
        let store = MemoryStore::new();
        let id = store.add("prescriptions", json!({ "created_at": server_timestamp() })).await.unwrap();
        let doc = store.get("prescriptions", &id).await.unwrap().unwrap();
        let stamped = doc.get("created_at").and_then(Value::as_str).unwrap();
        assert_ne!(stamped, SERVER_TIMESTAMP);
    }

    #[tokio::test]
    async fn test_query_respects_filter_and_limit() {
        let store = MemoryStore::new();
        store.insert("patients", "p1", json!({ "email": "a@x.com" })).await.unwrap();
        store.insert("patients", "p2", json!({ "email": "a@x.com" })).await.unwrap();
        store.insert("patients", "p3", json!({ "email": "b@x.com" })).await.unwrap();

        let found = store.query("patients", &Filter::eq("email", "a@x.com")).await.unwrap();
        assert_eq!(found.len(), 2);

        let first = store.query("patients", &Filter::eq("email", "a@x.com").limit(1)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "p1");
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.insert("doctors", "d1", json!({ "name": "Old" })).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set("doctors", "d1", json!({ "name": "New" }), true).unwrap();
        batch.update("users", "missing", json!({ "name": "New" })).unwrap();

        assert_matches!(store.commit(batch).await, Err(StoreError::NotFound { .. }));
        let doc = store.get("doctors", "d1").await.unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Old")));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        assert_matches!(store.add("users", json!({})).await, Err(StoreError::Rejected(_)));
        assert!(store.query("users", &Filter::all()).await.is_ok());

        store.set_unavailable(true);
        assert_matches!(store.get("users", "u1").await, Err(StoreError::Unavailable(_)));
    }
}
