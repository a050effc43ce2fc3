use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use shared_models::error::AppError;

/// Collection names used across the cells.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PATIENTS: &str = "patients";
    pub const DOCTORS: &str = "doctors";
    pub const RECEPTIONISTS: &str = "receptionists";
    pub const APPOINTMENTS: &str = "appointments";
    pub const PRESCRIPTIONS: &str = "prescriptions";
    pub const DIAGNOSIS_LOGS: &str = "diagnosis_logs";
}

/// Field value asking the store to stamp its own clock.
pub const SERVER_TIMESTAMP: &str = "__server_timestamp__";

pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value.as_str() == Some(SERVER_TIMESTAMP)
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::Malformed(msg) => AppError::Internal(msg),
            StoreError::Unavailable(_) | StoreError::Rejected(_) => AppError::Persistence(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decodes the fields with the document id injected as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Malformed(format!("{}: {}", self.id, e)))
    }
}

/// Equality filter with an optional limit. The store applies no ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<(String, Value)>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, fields: &Map<String, Value>, id: &str) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            if field == "id" {
                return expected.as_str() == Some(id);
            }
            fields.get(field) == Some(expected)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { collection: String, id: String, fields: Map<String, Value>, merge: bool },
    Update { collection: String, id: String, fields: Map<String, Value> },
}

/// Several writes committed together.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &str, id: &str, fields: Value, merge: bool) -> StoreResult<&mut Self> {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields: into_object(fields)?,
            merge,
        });
        Ok(self)
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Value) -> StoreResult<&mut Self> {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields: into_object(fields)?,
        });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

pub fn into_object(fields: Value) -> StoreResult<Map<String, Value>> {
    match fields {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!("expected an object, got {}", other))),
    }
}

/// Collection-scoped document CRUD offered by the hosted backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn query(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Creates or replaces a document; with `merge` only the given fields change.
    async fn set(&self, collection: &str, id: &str, fields: Value, merge: bool) -> StoreResult<()>;

    /// Patches an existing document. Fails with `NotFound` when it is missing.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()>;

    /// Inserts a document under a fresh id and returns that id.
    async fn add(&self, collection: &str, fields: Value) -> StoreResult<String>;

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_fields_and_id() {
        let fields = into_object(json!({ "doctor_id": "d1", "status": "Pending" })).unwrap();

        assert!(Filter::all().matches(&fields, "a1"));
        assert!(Filter::eq("doctor_id", "d1").matches(&fields, "a1"));
        assert!(Filter::eq("doctor_id", "d1").and_eq("status", "Pending").matches(&fields, "a1"));
        assert!(!Filter::eq("doctor_id", "d2").matches(&fields, "a1"));
        assert!(Filter::eq("id", "a1").matches(&fields, "a1"));
        assert!(!Filter::eq("missing", "x").matches(&fields, "a1"));
    }

    #[test]
    fn test_decode_injects_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document::new("n1", into_object(json!({ "name": "Ada" })).unwrap());
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "n1");
        assert_eq!(named.name, "Ada");
    }

    #[test]
    fn test_batch_rejects_non_objects() {
        let mut batch = WriteBatch::new();
        assert!(batch.set("users", "u1", json!("nope"), false).is_err());
        assert!(batch.is_empty());
    }
}
