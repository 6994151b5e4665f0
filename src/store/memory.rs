//! In-process document store. Collections share one [`MemoryDatabase`] so population can
//! reach across them.

use crate::config::{CollectionSchema, UPDATED_AT};
use crate::error::StoreError;
use crate::query::{compare_documents, Filter, ListQuery, Population};
use crate::schema::{merge_patch, stamp_new, timestamp, value_eq, DocumentValidator};
use crate::store::populate::{by_id, plan, splice};
use crate::store::{parse_id, Document, DocumentStore};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct Stored {
    /// Insertion order; final tie-break for sorting.
    seq: u64,
    doc: Document,
}

#[derive(Default)]
struct Collection {
    next_seq: u64,
    docs: HashMap<String, Stored>,
}

impl Collection {
    fn check_unique(&self, schema: &CollectionSchema, doc: &Document, except: Option<&str>) -> Result<(), StoreError> {
        for field in schema.unique_fields() {
            let Some(v) = doc.get(&field.name).filter(|v| !v.is_null()) else { continue };
            let taken = self.docs.iter().any(|(id, s)| {
                Some(id.as_str()) != except && s.doc.get(&field.name).is_some_and(|other| value_eq(other, v))
            });
            if taken {
                return Err(StoreError::Duplicate {
                    field: field.name.clone(),
                    value: match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        MemoryDatabase::default()
    }

    /// Handle to the collection described by `schema`, created empty on first use.
    pub fn collection(&self, schema: CollectionSchema) -> MemoryStore {
        if let Ok(mut guard) = self.collections.write() {
            guard.entry(schema.name.clone()).or_default();
        }
        MemoryStore {
            db: self.clone(),
            schema: Arc::new(schema),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Collection>) -> T) -> Result<T, StoreError> {
        let guard = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Collection>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }

    fn fetch_many(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        self.read(|cols| {
            cols.get(collection)
                .map(|c| ids.iter().filter_map(|id| c.docs.get(id)).map(|s| s.doc.clone()).collect())
                .unwrap_or_default()
        })
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    db: MemoryDatabase,
    schema: Arc<CollectionSchema>,
}

impl MemoryStore {
    fn name(&self) -> &str {
        &self.schema.name
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    async fn find_by_id(&self, id: &str, populate: &[Population]) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?.to_string();
        let found = self.db.read(|cols| {
            cols.get(self.name())
                .and_then(|c| c.docs.get(&id))
                .map(|s| s.doc.clone())
        })?;
        let Some(mut doc) = found else { return Ok(None) };
        let snapshot = doc.clone();
        for request in plan(&self.schema, &snapshot, populate) {
            let fetched = self.db.fetch_many(request.collection, &request.ids)?;
            splice(&mut doc, &request, &by_id(fetched));
        }
        Ok(Some(doc))
    }

    async fn find_by_id_and_update(&self, id: &str, patch: &Document) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?.to_string();
        let patch = DocumentValidator::validate_patch(&self.schema, patch).map_err(StoreError::Validation)?;
        let now = Utc::now();
        self.db.write(|cols| {
            let coll = cols.entry(self.name().to_string()).or_default();
            let Some(current) = coll.docs.get(&id).map(|s| s.doc.clone()) else {
                return Ok(None);
            };
            let Some(mut merged) = merge_patch(&current, &patch) else {
                return Ok(Some(current));
            };
            coll.check_unique(&self.schema, &merged, Some(&id))?;
            if self.schema.timestamps {
                merged.insert(UPDATED_AT.into(), Value::String(timestamp(now)));
            }
            if let Some(stored) = coll.docs.get_mut(&id) {
                stored.doc = merged.clone();
            }
            Ok(Some(merged))
        })
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let id = parse_id(id)?.to_string();
        self.db.write(|cols| {
            Ok(cols
                .get_mut(self.name())
                .and_then(|c| c.docs.remove(&id))
                .map(|s| s.doc))
        })
    }

    async fn create(&self, body: &Document) -> Result<Document, StoreError> {
        let now = Utc::now();
        let doc = DocumentValidator::validate_new(&self.schema, body, now).map_err(StoreError::Validation)?;
        let id = uuid::Uuid::new_v4().to_string();
        let doc = stamp_new(&self.schema, doc, &id, now);
        self.db.write(|cols| {
            let coll = cols.entry(self.name().to_string()).or_default();
            coll.check_unique(&self.schema, &doc, None)?;
            let seq = coll.next_seq;
            coll.next_seq += 1;
            coll.docs.insert(id, Stored { seq, doc: doc.clone() });
            Ok(doc)
        })
    }

    async fn find(&self, query: &ListQuery) -> Result<Vec<Document>, StoreError> {
        let mut rows: Vec<(u64, Document)> = self.db.read(|cols| {
            cols.get(self.name())
                .map(|c| {
                    c.docs
                        .values()
                        .filter(|s| query.where_filter().matches(&s.doc))
                        .map(|s| (s.seq, s.doc.clone()))
                        .collect()
                })
                .unwrap_or_default()
        })?;
        let newest_first = query.sort_keys().first().is_some_and(|k| k.descending);
        rows.sort_by(|a, b| {
            let by_seq = if newest_first { b.0.cmp(&a.0) } else { a.0.cmp(&b.0) };
            compare_documents(&a.1, &b.1, query.sort_keys()).then(by_seq)
        });

        let (skip, take) = match query.window() {
            Some(w) => (w.skip() as usize, w.limit as usize),
            None => (0, usize::MAX),
        };
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, doc)| query.projection().apply(doc))
            .collect())
    }

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.db.read(|cols| {
            cols.get(self.name())
                .map(|c| c.docs.values().filter(|s| filter.matches(&s.doc)).count() as u64)
                .unwrap_or(0)
        })
    }
}
