//! Generic CRUD over any [`DocumentStore`]: one persistence call per operation (listing adds
//! the count that feeds pagination).

use crate::error::{AppError, StoreError};
use crate::query::{Filter, ListQuery, Pagination, Population, QueryParams, DEFAULT_SEARCH_FIELD};
use crate::store::{Document, DocumentStore};
use serde_json::Value;

pub struct CrudService;

/// Listing result: one page of documents plus the pagination computed from the full count.
#[derive(Debug)]
pub struct Page {
    pub documents: Vec<Document>,
    pub pagination: Pagination,
}

impl CrudService {
    pub async fn delete<M: DocumentStore + ?Sized>(model: &M, id: &str) -> Result<(), AppError> {
        model
            .find_by_id_and_delete(id)
            .await?
            .ok_or_else(|| AppError::not_found_id(id))?;
        tracing::info!(collection = %model.schema().name, id, "document deleted");
        Ok(())
    }

    pub async fn update<M: DocumentStore + ?Sized>(model: &M, id: &str, body: Value) -> Result<Document, AppError> {
        let patch = body_to_map(body)?;
        model
            .find_by_id_and_update(id, &patch)
            .await
            .map_err(invalid_input)?
            .ok_or_else(|| AppError::not_found_id(id))
    }

    pub async fn create<M: DocumentStore + ?Sized>(model: &M, body: Value) -> Result<Document, AppError> {
        let body = body_to_map(body)?;
        let doc = model.create(&body).await.map_err(invalid_input)?;
        let id = doc.get(crate::config::ID_FIELD).and_then(|v| v.as_str()).unwrap_or_default();
        tracing::info!(collection = %model.schema().name, id, "document created");
        Ok(doc)
    }

    pub async fn read<M: DocumentStore + ?Sized>(
        model: &M,
        id: &str,
        populate: &[Population],
    ) -> Result<Document, AppError> {
        model
            .find_by_id(id, populate)
            .await?
            .ok_or_else(|| AppError::not_found_id(id))
    }

    /// Filter → search → count → project → sort → paginate → fetch.
    pub async fn list<M: DocumentStore + ?Sized>(
        model: &M,
        scope: Filter,
        params: &QueryParams,
        search_fields: &[String],
    ) -> Result<Page, AppError> {
        let schema = model.schema();
        let query = ListQuery::new(scope)
            .filter(schema, params)
            .search(search_fields, params);
        let total = model.count_documents(query.where_filter()).await?;
        let query = query
            .limit_fields(params)
            .sort(schema, params)
            .paginate(params, total);
        let documents = model.find(&query).await?;
        let pagination = query
            .pagination()
            .cloned()
            .unwrap_or_else(|| Pagination::compute(1, documents.len() as u64, total));
        Ok(Page { documents, pagination })
    }

    /// Search fields for a listing: the collection's own when named, otherwise `name`.
    pub fn search_fields<M: DocumentStore + ?Sized>(model: &M, model_name: Option<&str>) -> Vec<String> {
        let schema = model.schema();
        match model_name {
            Some(_) if !schema.search_fields.is_empty() => schema.search_fields.clone(),
            _ => vec![DEFAULT_SEARCH_FIELD.to_string()],
        }
    }
}

fn body_to_map(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        Value::Null => Ok(Document::new()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Model validation failures become `Invalid input: ...`; any other store fault is forwarded as is.
fn invalid_input(err: StoreError) -> AppError {
    match err {
        StoreError::Validation(errors) => AppError::invalid_input(&errors),
        other => AppError::Store(other),
    }
}
