//! Document store: collections of JSON documents addressed by id.
//!
//! Handlers never see raw documents: each entity in `models` converts from a
//! `Document` exactly once. Two backends implement `DocumentStore`:
//! `PgDocumentStore` (JSONB table) and `InMemoryDocumentStore`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("{collection}/{id} is malformed: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A stored document with server-assigned timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Deserializes the body into a record type, reporting failures against this document.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| StoreError::Malformed {
            collection: self.collection.clone(),
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Top-level field equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document. A new v4 UUID is used when `id` is `None`.
    async fn create(
        &self,
        collection: &str,
        id: Option<String>,
        data: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents matching every filter, newest first.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merges `patch` into the document and bumps `updated_at`.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}

/// Serializes a record into a document body.
pub fn to_body<T: Serialize>(record: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn newest_first(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
