//! Route builders.

pub mod collection;
pub mod common;

pub use collection::{collection_routes, nested_collection_routes, RouteOptions};
pub use common::{common_routes, ready_routes, Stores};

use crate::handlers::{scope_to_parent, ParentScope, PARENT_PARAM};
use crate::store::DocumentStore;
use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub const API_PREFIX: &str = "/api/v1";

/// Every collection under `/<path_segment>`, plus `/<parent>/:id/<path_segment>` for
/// collections that declare a parent.
pub fn api_routes(stores: &[Arc<dyn DocumentStore>]) -> Router {
    let mut api = Router::new();
    for store in stores {
        let schema = store.schema();
        let options = RouteOptions::for_schema(schema);
        api = api.nest(
            &format!("/{}", schema.path_segment),
            collection_routes(Arc::clone(store), options.clone()),
        );
        if let Some(parent) = &schema.parent {
            let path = format!("/{}/:{}/{}", parent.path_segment, PARENT_PARAM, schema.path_segment);
            let scope = ParentScope {
                field: parent.field.clone(),
            };
            let nested = Router::new()
                .nest(&path, nested_collection_routes(Arc::clone(store), options))
                .route_layer(from_fn_with_state(scope, scope_to_parent));
            api = api.merge(nested);
        }
    }
    api
}

/// Full application router: API under `/api/v1`, health/version/ready at the root.
pub fn app_router(stores: Vec<Arc<dyn DocumentStore>>, body_limit: usize) -> Router {
    let api = api_routes(&stores);
    let stores: Stores = stores.into();
    Router::new()
        .nest(API_PREFIX, api)
        .merge(common_routes())
        .merge(ready_routes(stores))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
}
