//! Per-collection routers wired to the handler factory.

use crate::config::CollectionSchema;
use crate::handlers::{create_one, delete_one, get_all, get_one, update_one};
use crate::query::Population;
use crate::store::DocumentStore;
use axum::{routing::get, Router};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct RouteOptions {
    /// Enables the collection's own search fields for `keyword`.
    pub model_name: Option<String>,
    /// Expanded on `GET /:id`.
    pub populate: Option<Vec<Population>>,
}

impl RouteOptions {
    pub fn for_schema(schema: &CollectionSchema) -> Self {
        RouteOptions {
            model_name: Some(schema.name.clone()),
            populate: (!schema.populate.is_empty()).then(|| schema.populate.clone()),
        }
    }
}

/// `GET|POST /` and `GET|PATCH|PUT|DELETE /:id`.
pub fn collection_routes<M>(model: Arc<M>, options: RouteOptions) -> Router
where
    M: DocumentStore + ?Sized + 'static,
{
    let update = update_one(Arc::clone(&model));
    Router::new()
        .route(
            "/",
            get(get_all(Arc::clone(&model), options.model_name.as_deref())).post(create_one(Arc::clone(&model))),
        )
        .route(
            "/:id",
            get(get_one(Arc::clone(&model), options.populate))
                .patch(update.clone())
                .put(update)
                .delete(delete_one(model)),
        )
}

/// `GET|POST /` only, for mounting under a parent document.
pub fn nested_collection_routes<M>(model: Arc<M>, options: RouteOptions) -> Router
where
    M: DocumentStore + ?Sized + 'static,
{
    Router::new().route(
        "/",
        get(get_all(Arc::clone(&model), options.model_name.as_deref())).post(create_one(model)),
    )
}
