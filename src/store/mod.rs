//! Document store capability interface and its backends.

mod memory;
pub mod pg;
pub mod populate;

pub use memory::{MemoryDatabase, MemoryStore};
pub use pg::{ensure_collection, ensure_database_exists, PgStore};

use crate::config::CollectionSchema;
use crate::error::StoreError;
use crate::query::{Filter, ListQuery, Population};
use async_trait::async_trait;

/// A stored document: a JSON object carrying `_id` and, when enabled, `createdAt`/`updatedAt`.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Operations the CRUD handlers need from a collection. Implementations own validation
/// (the schema's rules run inside `create` and `find_by_id_and_update`) and id parsing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn schema(&self) -> &CollectionSchema;

    async fn find_by_id(&self, id: &str, populate: &[Population]) -> Result<Option<Document>, StoreError>;

    /// Validate `patch` against the fields it names, merge it, and return the document after the update.
    async fn find_by_id_and_update(&self, id: &str, patch: &Document) -> Result<Option<Document>, StoreError>;

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError>;

    async fn create(&self, body: &Document) -> Result<Document, StoreError>;

    async fn find(&self, query: &ListQuery) -> Result<Vec<Document>, StoreError>;

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Parse a path id; anything but a UUID is a cast failure, not a miss.
pub(crate) fn parse_id(id: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(id.trim()).map_err(|_| StoreError::Cast {
        path: crate::config::ID_FIELD.to_string(),
        value: id.to_string(),
    })
}
