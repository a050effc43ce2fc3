use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method, StatusCode,
};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::store::{
    into_object, is_server_timestamp, Document, DocumentStore, Filter, StoreError, StoreResult,
    WriteBatch, WriteOp,
};
use crate::supabase::SupabaseClient;

/// `DocumentStore` over Supabase PostgREST: one table per collection with a
/// text `id` primary key and a `created_at` column defaulting to `now()`.
pub struct SupabaseStore {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: None,
        }
    }

    /// Runs requests as the signed-in user so row-level security applies.
    pub fn with_auth_token(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: Some(auth_token.to_string()),
        }
    }

    fn table_path(collection: &str) -> String {
        format!("/rest/v1/{}", collection)
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }

    fn query_path(collection: &str, filter: &Filter) -> String {
        let mut parts: Vec<String> = filter
            .conditions
            .iter()
            .map(|(field, value)| {
                format!("{}=eq.{}", field, urlencoding::encode(&Self::render_value(value)))
            })
            .collect();

        if let Some(limit) = filter.limit {
            parts.push(format!("limit={}", limit));
        }

        if parts.is_empty() {
            Self::table_path(collection)
        } else {
            format!("{}?{}", Self::table_path(collection), parts.join("&"))
        }
    }

    fn id_path(collection: &str, id: &str) -> String {
        format!("{}?id=eq.{}", Self::table_path(collection), urlencoding::encode(id))
    }

    /// The table default stamps `created_at`, so sentinel fields are dropped.
    fn strip_server_timestamps(mut fields: Map<String, Value>) -> Map<String, Value> {
        fields.retain(|_, value| !is_server_timestamp(value));
        fields
    }

    fn prefer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(value));
        headers
    }

    fn map_failure(status: StatusCode, payload: &Value) -> StoreError {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string());

        error!("PostgREST error ({}): {}", status, message);

        if status.is_server_error() {
            StoreError::Unavailable(format!("{}: {}", status, message))
        } else {
            StoreError::Rejected(format!("{}: {}", status, message))
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> StoreResult<Value> {
        let (status, payload) = self
            .supabase
            .send(method, path, self.auth_token.as_deref(), body, headers)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_failure(status, &payload));
        }

        Ok(payload)
    }

    fn rows_into_documents(payload: Value) -> StoreResult<Vec<Document>> {
        let rows = match payload {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => return Err(StoreError::Malformed(format!("expected rows, got {}", other))),
        };

        rows.into_iter()
            .map(|row| {
                let mut fields = into_object(row)?;
                let id = match fields.remove("id") {
                    Some(Value::String(id)) => id,
                    Some(other) => Self::render_value(&other),
                    None => return Err(StoreError::Malformed("row without id".to_string())),
                };
                Ok(Document::new(id, fields))
            })
            .collect()
    }

    async fn upsert(&self, collection: &str, id: &str, fields: Map<String, Value>, merge: bool) -> StoreResult<()> {
        let mut row = Self::strip_server_timestamps(fields);
        row.insert("id".to_string(), Value::String(id.to_string()));

        if merge {
            self.call(
                Method::POST,
                &Self::table_path(collection),
                Some(Value::Object(row)),
                Some(Self::prefer("resolution=merge-duplicates,return=minimal")),
            )
            .await?;
        } else {
            // PUT replaces the whole row, mirroring a non-merge set.
            self.call(
                Method::PUT,
                &Self::id_path(collection, id),
                Some(Value::Object(row)),
                Some(Self::prefer("return=minimal")),
            )
            .await?;
        }
        Ok(())
    }

    async fn patch(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let fields = Self::strip_server_timestamps(fields);
        let payload = self
            .call(
                Method::PATCH,
                &Self::id_path(collection, id),
                Some(Value::Object(fields)),
                Some(Self::prefer("return=representation")),
            )
            .await?;

        if Self::rows_into_documents(payload)?.is_empty() {
            return Err(StoreError::NotFound { collection: collection.to_string(), id: id.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        debug!("Fetching {}/{}", collection, id);
        let payload = self.call(Method::GET, &Self::id_path(collection, id), None, None).await?;
        Ok(Self::rows_into_documents(payload)?.into_iter().next())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let path = Self::query_path(collection, filter);
        debug!("Querying {}", path);
        let payload = self.call(Method::GET, &path, None, None).await?;
        Self::rows_into_documents(payload)
    }

    async fn set(&self, collection: &str, id: &str, fields: Value, merge: bool) -> StoreResult<()> {
        debug!("Setting {}/{} (merge: {})", collection, id, merge);
        self.upsert(collection, id, into_object(fields)?, merge).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        debug!("Updating {}/{}", collection, id);
        self.patch(collection, id, into_object(fields)?).await
    }

    async fn add(&self, collection: &str, fields: Value) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut row = Self::strip_server_timestamps(into_object(fields)?);
        row.insert("id".to_string(), Value::String(id.clone()));

        debug!("Inserting {}/{}", collection, id);
        self.call(
            Method::POST,
            &Self::table_path(collection),
            Some(Value::Object(row)),
            Some(Self::prefer("return=minimal")),
        )
        .await?;

        Ok(id)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        // PostgREST has no cross-table transaction; writes go out in order and
        // the first failure stops the rest.
        if batch.len() > 1 {
            warn!("Committing {} writes sequentially; partial application is possible", batch.len());
        }

        for op in batch.into_ops() {
            match op {
                WriteOp::Set { collection, id, fields, merge } => {
                    self.upsert(&collection, &id, fields, merge).await?
                }
                WriteOp::Update { collection, id, fields } => {
                    self.patch(&collection, &id, fields).await?
                }
            }
        }
        Ok(())
    }
}
