//! PostgreSQL backend: one JSONB table per collection.

mod builder;

pub use builder::QueryBuf;

use crate::config::{CollectionSchema, UPDATED_AT};
use crate::error::StoreError;
use crate::query::{Filter, ListQuery, Population};
use crate::schema::{stamp_new, timestamp, DocumentValidator};
use crate::store::populate::{by_id, plan, splice};
use crate::store::{parse_id, Document, DocumentStore};
use async_trait::async_trait;
use builder::{qualified_table, quoted, unique_field_from_index, unique_index_name};
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    /// PostgreSQL schema holding the collection tables.
    data_schema: String,
    schema: Arc<CollectionSchema>,
}

impl PgStore {
    pub fn new(pool: PgPool, data_schema: impl Into<String>, schema: CollectionSchema) -> Self {
        PgStore {
            pool,
            data_schema: data_schema.into(),
            schema: Arc::new(schema),
        }
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Document>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_document(&r)))
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Document>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    /// Unique index violations become `Duplicate`; everything else passes through as `Db`.
    fn classify(&self, e: sqlx::Error, doc: &Document) -> StoreError {
        let field = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => db
                .constraint()
                .and_then(|c| unique_field_from_index(&self.schema.name, c))
                .map(str::to_string),
            _ => None,
        };
        match field {
            Some(field) => StoreError::Duplicate {
                value: match doc.get(&field) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
                field,
            },
            None => StoreError::Db(e),
        }
    }
}

fn row_to_document(row: &PgRow) -> Document {
    match row.try_get::<Value, _>("doc") {
        Ok(Value::Object(map)) => map,
        _ => Document::new(),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    async fn find_by_id(&self, id: &str, populate: &[Population]) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?;
        let q = builder::select_by_id(&self.data_schema, &self.schema.name, &id);
        let Some(mut doc) = self.fetch_optional(&q).await? else {
            return Ok(None);
        };
        let snapshot = doc.clone();
        for request in plan(&self.schema, &snapshot, populate) {
            let ids: Vec<uuid::Uuid> = request.ids.iter().filter_map(|i| uuid::Uuid::parse_str(i).ok()).collect();
            let fetched = if ids.is_empty() {
                Vec::new()
            } else {
                let q = builder::select_by_ids(&self.data_schema, request.collection, &ids);
                self.fetch_all(&q).await?
            };
            splice(&mut doc, &request, &by_id(fetched));
        }
        Ok(Some(doc))
    }

    async fn find_by_id_and_update(&self, id: &str, patch: &Document) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?;
        let patch = DocumentValidator::validate_patch(&self.schema, patch).map_err(StoreError::Validation)?;
        let mut stamp = Document::new();
        if self.schema.timestamps {
            stamp.insert(UPDATED_AT.into(), Value::String(timestamp(Utc::now())));
        }
        let q = builder::update(&self.data_schema, &self.schema.name, &id, &patch, &stamp);
        self.fetch_optional(&q).await.map_err(|e| self.classify(e, &patch))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?;
        let q = builder::delete(&self.data_schema, &self.schema.name, &id);
        Ok(self.fetch_optional(&q).await?)
    }

    async fn create(&self, body: &Document) -> Result<Document, StoreError> {
        let now = Utc::now();
        let doc = DocumentValidator::validate_new(&self.schema, body, now).map_err(StoreError::Validation)?;
        let id = uuid::Uuid::new_v4().to_string();
        let doc = stamp_new(&self.schema, doc, &id, now);
        let q = builder::insert(&self.data_schema, &self.schema.name, &id, &doc);
        match self.fetch_optional(&q).await {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(StoreError::Db(sqlx::Error::RowNotFound)),
            Err(e) => Err(self.classify(e, &doc)),
        }
    }

    async fn find(&self, query: &ListQuery) -> Result<Vec<Document>, StoreError> {
        let q = builder::select_list(&self.data_schema, &self.schema.name, query);
        let rows = self.fetch_all(&q).await?;
        Ok(rows.into_iter().map(|d| query.projection().apply(d)).collect())
    }

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        let q = builder::count(&self.data_schema, &self.schema.name, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let row = query.fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the data schema and collection table, plus a unique expression index per unique field.
pub async fn ensure_collection(pool: &PgPool, data_schema: &str, schema: &CollectionSchema) -> Result<(), StoreError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(data_schema)))
        .execute(pool)
        .await?;
    let table = qualified_table(data_schema, &schema.name);
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            doc JSONB NOT NULL
        )
        "#,
        table
    );
    sqlx::query(&ddl).execute(pool).await?;
    for field in schema.unique_fields() {
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc ->> '{}'))",
            quoted(&unique_index_name(&schema.name, &field.name)),
            table,
            field.name.replace('\'', "''")
        );
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(collection = %schema.name, "collection table ready");
    Ok(())
}

/// Connect to the `postgres` maintenance database and create the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Db(sqlx::Error::Configuration("DATABASE_URL: no path".into())))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
