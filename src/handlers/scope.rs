//! Middleware for collections mounted below a parent document.

use crate::error::{AppError, StoreError};
use crate::extractors::{BodyDefaults, FilterObj};
use crate::query::{Condition, Filter};
use crate::store::Document;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::collections::HashMap;

/// Path parameter carrying the parent id.
pub const PARENT_PARAM: &str = "id";

/// Field of the child collection that stores the parent id.
#[derive(Clone, Debug)]
pub struct ParentScope {
    pub field: String,
}

/// Pins listings to the parent (`FilterObj`) and fills the parent field of created documents
/// (`BodyDefaults`).
pub async fn scope_to_parent(
    State(scope): State<ParentScope>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let parent_id = params
        .get(PARENT_PARAM)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("missing {} path parameter", PARENT_PARAM)))?;
    let value = Value::String(canonical_parent_id(&scope.field, &parent_id)?);
    tracing::debug!(field = %scope.field, parent = %value, "scoping request to parent");

    let mut defaults = Document::new();
    defaults.insert(scope.field.clone(), value.clone());
    req.extensions_mut()
        .insert(FilterObj(Filter::new().and(Condition::eq(scope.field.as_str(), value))));
    req.extensions_mut().insert(BodyDefaults(defaults));
    Ok(next.run(req).await)
}

/// Parent ids are document ids; stored and matched in their hyphenated lowercase form.
fn canonical_parent_id(field: &str, raw: &str) -> Result<String, StoreError> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| StoreError::Cast {
            path: field.to_string(),
            value: raw.to_string(),
        })
}
