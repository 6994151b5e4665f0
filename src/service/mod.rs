//! CRUD service: the one persistence call behind each handler.

pub mod crud;

pub use crud::{CrudService, Page};
