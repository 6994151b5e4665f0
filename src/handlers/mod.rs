//! Generic CRUD handler factories and the parent-scope middleware.

pub mod factory;
pub mod scope;

pub use factory::{create_one, delete_one, get_all, get_one, update_one, HandlerFuture};
pub use scope::{scope_to_parent, ParentScope, PARENT_PARAM};
