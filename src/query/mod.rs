//! Listing query descriptor and its fixed pipeline: filter → search → project → sort → paginate.
//!
//! Each step consumes the descriptor and returns a new one; backends only read the result.

mod filter;
mod pagination;
mod projection;
mod sort;

pub use filter::*;
pub use pagination::*;
pub use projection::*;
pub use sort::*;

use crate::config::{CollectionSchema, CREATED_AT};
use std::collections::BTreeMap;

pub type QueryParams = BTreeMap<String, String>;

/// Query-string keys that never become filter conditions.
pub const RESERVED_PARAMS: [&str; 5] = ["page", "sort", "limit", "fields", "keyword"];

/// Field used for free-text search when the handler is not given a model name.
pub const DEFAULT_SEARCH_FIELD: &str = "name";

/// Replace the reference id(s) stored at `path` with the referenced document(s).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Population {
    pub path: String,
    pub select: Option<Vec<String>>,
}

impl Population {
    pub fn path(path: impl Into<String>) -> Self {
        Population {
            path: path.into(),
            select: None,
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    filter: Filter,
    projection: Projection,
    sort: Vec<SortKey>,
    window: Option<PageRequest>,
    pagination: Option<Pagination>,
}

impl ListQuery {
    /// Start from the upstream scope filter (empty when none was injected).
    pub fn new(scope: Filter) -> Self {
        ListQuery {
            filter: scope,
            ..Default::default()
        }
    }

    pub fn filter(self, schema: &CollectionSchema, params: &QueryParams) -> Self {
        let filter = Filter::from_query(schema, params).scoped_by(&self.filter);
        ListQuery { filter, ..self }
    }

    pub fn search(self, fields: &[String], params: &QueryParams) -> Self {
        let term = params.get("keyword").map(|k| k.trim()).filter(|k| !k.is_empty());
        match term {
            Some(term) if !fields.is_empty() => ListQuery {
                filter: self.filter.with_search(TextSearch {
                    fields: fields.to_vec(),
                    term: term.to_string(),
                }),
                ..self
            },
            _ => self,
        }
    }

    pub fn limit_fields(self, params: &QueryParams) -> Self {
        let projection = params.get("fields").map(|f| Projection::parse(f)).unwrap_or_default();
        ListQuery { projection, ..self }
    }

    /// Sort keys from `sort`; unknown fields are dropped. Defaults to newest first when the
    /// collection keeps timestamps.
    pub fn sort(self, schema: &CollectionSchema, params: &QueryParams) -> Self {
        let requested: Vec<SortKey> = params
            .get("sort")
            .map(|s| SortKey::parse_list(s))
            .unwrap_or_default()
            .into_iter()
            .filter(|k| schema.field(&k.field).is_some())
            .collect();
        let sort = if !requested.is_empty() {
            requested
        } else if schema.timestamps {
            vec![SortKey::desc(CREATED_AT)]
        } else {
            Vec::new()
        };
        ListQuery { sort, ..self }
    }

    /// Fix the page window and compute pagination metadata from the pre-pagination total.
    pub fn paginate(self, params: &QueryParams, total: u64) -> Self {
        let window = PageRequest::from_params(params);
        ListQuery {
            window: Some(window),
            pagination: Some(Pagination::compute(window.page, window.limit, total)),
            ..self
        }
    }

    pub fn where_filter(&self) -> &Filter {
        &self.filter
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn window(&self) -> Option<PageRequest> {
        self.window
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldSchema, FieldType};
    use serde_json::json;

    fn schema() -> CollectionSchema {
        CollectionSchema::new(
            "products",
            "products",
            vec![
                FieldSchema::new("title", FieldType::String),
                FieldSchema::new("price", FieldType::Number),
                FieldSchema::new("category", FieldType::Id),
            ],
        )
        .with_search_fields(&["title"])
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn pipeline_threads_every_step() {
        let schema = schema();
        let p = params(&[
            ("price[lt]", "100"),
            ("keyword", " lamp "),
            ("fields", "title"),
            ("sort", "-price,bogus"),
            ("page", "2"),
            ("limit", "10"),
        ]);
        let q = ListQuery::new(Filter::new())
            .filter(&schema, &p)
            .search(&schema.search_fields, &p)
            .limit_fields(&p)
            .sort(&schema, &p)
            .paginate(&p, 25);

        assert_eq!(q.where_filter().conditions, vec![Condition::new("price", CompareOp::Lt, json!(100))]);
        assert_eq!(q.where_filter().search.as_ref().unwrap().term, "lamp");
        assert_eq!(q.projection(), &Projection::Include(vec!["title".into()]));
        assert_eq!(q.sort_keys(), [SortKey::desc("price")]);
        assert_eq!(q.window(), Some(PageRequest { page: 2, limit: 10 }));
        assert_eq!(q.pagination().unwrap().number_of_pages, 3);
    }

    #[test]
    fn scope_filter_survives_query_filters() {
        let schema = schema();
        let scope = Filter::new().and(Condition::eq("category", json!("c1")));
        let q = ListQuery::new(scope).filter(&schema, &params(&[("category", "c2"), ("title", "x")]));
        assert_eq!(
            q.where_filter().conditions,
            vec![Condition::eq("category", json!("c1")), Condition::eq("title", json!("x"))]
        );
    }

    #[test]
    fn default_sort_is_newest_first() {
        let q = ListQuery::default().sort(&schema(), &QueryParams::new());
        assert_eq!(q.sort_keys(), [SortKey::desc(CREATED_AT)]);
        let q = ListQuery::default().sort(&schema().without_timestamps(), &QueryParams::new());
        assert!(q.sort_keys().is_empty());
    }

    #[test]
    fn blank_keyword_adds_no_search() {
        let q = ListQuery::default().search(&["title".to_string()], &params(&[("keyword", "  ")]));
        assert!(q.where_filter().search.is_none());
    }
}
