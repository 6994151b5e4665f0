//! CRUD factory: generic create/read/update/delete/list handlers over pluggable document
//! stores, served with axum.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod store;

pub use config::{load_collections, resolve, Backend, CollectionConfig, CollectionSchema, ResolvedModel, ServerConfig};
pub use error::{AppError, ConfigError, StoreError};
pub use extractors::{BodyDefaults, FilterObj, RequestContext};
pub use handlers::{create_one, delete_one, get_all, get_one, update_one};
pub use query::{ListQuery, Population};
pub use response::{success_created, success_message, success_one, success_page, Envelope};
pub use routes::{app_router, collection_routes, common_routes, ready_routes, RouteOptions};
pub use service::CrudService;
pub use store::{ensure_collection, ensure_database_exists, Document, DocumentStore, MemoryDatabase, MemoryStore, PgStore};
