//! Postgres-backed document store
//!
//! Each collection is a table `(id TEXT PRIMARY KEY, doc JSONB)`. Attachments
//! live in a single `sos_attachments` table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{ensure_id, lookup, DocumentStore, Filter, StoreError, StoreResult, ID_FIELD};

/// SQLSTATE codes Postgres uses for resource exhaustion
const TOO_MANY_CONNECTIONS: &str = "53300";
const CONFIGURATION_LIMIT_EXCEEDED: &str = "53400";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => {
                StoreError::RateLimited("connection pool exhausted".to_string())
            }
            sqlx::Error::Database(db)
                if matches!(
                    db.code().as_deref(),
                    Some(TOO_MANY_CONNECTIONS) | Some(CONFIGURATION_LIMIT_EXCEEDED)
                ) =>
            {
                StoreError::RateLimited(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Table name for a collection; names must match `^[a-z0-9_]+$`
fn table_name(collection: &str) -> StoreResult<String> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(format!("\"{}\"", collection))
    } else {
        Err(StoreError::InvalidCollectionName(collection.to_string()))
    }
}

fn json_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// Pair every document with its id; later duplicates of an id replace earlier ones
fn keyed_rows(docs: Vec<Value>) -> StoreResult<Vec<(String, Value)>> {
    let mut order: Vec<String> = Vec::with_capacity(docs.len());
    let mut rows: HashMap<String, Value> = HashMap::with_capacity(docs.len());
    for mut doc in docs {
        let id = ensure_id(&mut doc)?;
        if rows.insert(id.clone(), doc).is_none() {
            order.push(id);
        }
    }
    Ok(order
        .into_iter()
        .filter_map(|id| rows.remove(&id).map(|doc| (id, doc)))
        .collect())
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the attachment table exists
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!(max_connections, "Connected to document store");
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sos_attachments (
                bucket TEXT NOT NULL,
                name TEXT NOT NULL,
                content BYTEA NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (bucket, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_rows(
        &self,
        table: &str,
        rows: &[(String, Value)],
        replace: bool,
    ) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (id, doc) ", table));
        query_builder.push_values(rows, |mut b, (id, doc)| {
            b.push_bind(id).push_bind(doc);
        });
        if replace {
            query_builder.push(" ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc");
        } else {
            query_builder.push(" ON CONFLICT (id) DO NOTHING");
        }

        let result = query_builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> StoreResult<usize> {
        let table = table_name(collection)?;
        self.create_collection(collection).await?;

        let rows = keyed_rows(docs)?;
        let inserted = self.write_rows(&table, &rows, false).await?;
        debug!(collection, attempted = rows.len(), inserted, "Inserted documents");
        Ok(inserted)
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        mut docs: Vec<Value>,
        match_field: &str,
    ) -> StoreResult<usize> {
        let table = table_name(collection)?;
        self.create_collection(collection).await?;

        let keys: Vec<Value> = docs
            .iter()
            .filter_map(|doc| lookup(doc, match_field).cloned())
            .collect();

        if !keys.is_empty() {
            let existing: Vec<(String, Value)> = sqlx::query_as(&format!(
                "SELECT id, doc #> $1 FROM {} WHERE doc #> $1 = ANY($2)",
                table
            ))
            .bind(json_path(match_field))
            .bind(&keys)
            .fetch_all(&self.pool)
            .await?;

            let ids_by_key: HashMap<String, String> = existing
                .into_iter()
                .map(|(id, key)| (key.to_string(), id))
                .collect();

            for doc in docs.iter_mut() {
                let existing_id = lookup(doc, match_field)
                    .and_then(|key| ids_by_key.get(&key.to_string()))
                    .cloned();
                if let (Some(id), Some(obj)) = (existing_id, doc.as_object_mut()) {
                    obj.insert(ID_FIELD.to_string(), Value::String(id));
                }
            }
        }

        let rows = keyed_rows(docs)?;
        self.write_rows(&table, &rows, true).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let table = table_name(collection)?;
        if !self.collection_exists(collection).await? {
            return Ok(Vec::new());
        }

        let docs = match filter {
            Filter::All => {
                sqlx::query_scalar(&format!("SELECT doc FROM {} ORDER BY id", table))
                    .fetch_all(&self.pool)
                    .await?
            }
            Filter::Eq { field, value } => {
                sqlx::query_scalar(&format!(
                    "SELECT doc FROM {} WHERE doc #> $1 = $2 ORDER BY id",
                    table
                ))
                .bind(json_path(field))
                .bind(value)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::In { field, values } => {
                if values.is_empty() {
                    return Ok(Vec::new());
                }
                sqlx::query_scalar(&format!(
                    "SELECT doc FROM {} WHERE doc #> $1 = ANY($2) ORDER BY id",
                    table
                ))
                .bind(json_path(field))
                .bind(values)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(docs)
    }

    async fn find_page(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Value>> {
        let table = table_name(collection)?;
        if !self.collection_exists(collection).await? {
            return Ok(Vec::new());
        }

        let docs = sqlx::query_scalar(&format!(
            "SELECT doc FROM {} ORDER BY id OFFSET $1 LIMIT $2",
            table
        ))
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn create_collection(&self, collection: &str) -> StoreResult<()> {
        let table = table_name(collection)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
            table
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        let table = table_name(collection)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> StoreResult<bool> {
        table_name(collection)?;
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        let table = table_name(collection)?;
        if !self.collection_exists(collection).await? {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        let from_table = table_name(from)?;
        let to_table = table_name(to)?;
        if !self.collection_exists(from).await? {
            return Err(StoreError::CollectionNotFound(from.to_string()));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", to_table))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", from_table, to_table))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(from, to, "Renamed collection");
        Ok(())
    }

    async fn put_attachment(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sos_attachments (bucket, name, content)
            VALUES ($1, $2, $3)
            ON CONFLICT (bucket, name)
            DO UPDATE SET content = EXCLUDED.content, created_at = NOW()
            "#,
        )
        .bind(bucket)
        .bind(name)
        .bind(bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::document_id;
    use serde_json::json;

    #[test]
    fn test_table_name_validation() {
        assert_eq!(table_name("observations_7_temp").unwrap(), "\"observations_7_temp\"");
        assert!(table_name("Observations").is_err());
        assert!(table_name("obs; DROP TABLE x").is_err());
        assert!(table_name("").is_err());
    }

    #[test]
    fn test_keyed_rows_last_duplicate_wins() {
        let rows = keyed_rows(vec![
            json!({"_id": "a", "v": 1}),
            json!({"_id": "b"}),
            json!({"_id": "a", "v": 2}),
        ])
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "a");
        assert_eq!(rows[0].1["v"], 2);
        assert_eq!(document_id(&rows[1].1).as_deref(), Some("b"));
    }

    #[test]
    fn test_pool_timeout_is_rate_limited() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_rate_limited());

        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_rate_limited());
    }
}
