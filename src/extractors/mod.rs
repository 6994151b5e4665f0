//! Request extractors for the generic handlers.

pub mod context;

pub use context::{BodyDefaults, FilterObj, RequestContext};
