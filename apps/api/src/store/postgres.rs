use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use tracing::info;

use super::{new_id, Document, DocumentStore, Filter, StoreError};

const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT        NOT NULL,
    id          TEXT        NOT NULL,
    data        JSONB       NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
)"#;

const CREATE_DATA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_data_idx ON documents USING GIN (data jsonb_path_ops)";

#[derive(Debug, FromRow)]
struct DocumentRow {
    collection: String,
    id: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        match row.data {
            Value::Object(data) => Ok(Document {
                id: row.id,
                collection: row.collection,
                data,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }),
            _ => Err(StoreError::Malformed {
                collection: row.collection,
                id: row.id,
                reason: "stored body is not an object".to_string(),
            }),
        }
    }
}

/// Postgres-backed store: one `documents` table, bodies in JSONB.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and its containment index if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_DOCUMENTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_DATA_INDEX).execute(&self.pool).await?;
        info!("Document store schema ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(
        &self,
        collection: &str,
        id: Option<String>,
        data: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let id = id.unwrap_or_else(new_id);
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING collection, id, data, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(Value::Object(data))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::AlreadyExists {
            collection: collection.to_string(),
            id,
        })?
        .try_into()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT collection, id, data, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let containment: Map<String, Value> = filters
            .iter()
            .map(|f| (f.field.clone(), f.value.clone()))
            .collect();

        let rows: Vec<DocumentRow> = sqlx::query_as(
            r#"
            SELECT collection, id, data, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND data @> $2
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(collection)
        .bind(Value::Object(containment))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING collection, id, data, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?
        .try_into()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
