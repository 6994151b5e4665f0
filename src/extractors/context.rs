//! Per-request input for the generic handlers: path params, query string, JSON body, and the
//! optional scope filter left by upstream middleware.

use crate::error::AppError;
use crate::query::{Filter, QueryParams};
use crate::store::Document;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::StatusCode,
};
use serde_json::Value;
use std::collections::HashMap;

/// Filter injected by middleware (request extension). Merged into every listing; its fields win.
#[derive(Clone, Debug, Default)]
pub struct FilterObj(pub Filter);

/// Body values injected by middleware; applied to keys the client left out.
#[derive(Clone, Debug, Default)]
pub struct BodyDefaults(pub Document);

#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub params: HashMap<String, String>,
    pub query: QueryParams,
    pub body: Value,
    pub filter_obj: Option<FilterObj>,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.params.insert("id".into(), id.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter_obj = Some(FilterObj(filter));
        self
    }

    /// The `:id` path parameter.
    pub fn id(&self) -> Result<&str, AppError> {
        self.params
            .get("id")
            .map(String::as_str)
            .ok_or_else(|| AppError::BadRequest("missing id path parameter".into()))
    }

    /// The scope filter, or an empty one.
    pub fn scope(&self) -> Filter {
        self.filter_obj.as_ref().map(|f| f.0.clone()).unwrap_or_default()
    }
}

fn apply_defaults(body: Value, defaults: &Document) -> Value {
    if defaults.is_empty() {
        return body;
    }
    let mut map = match body {
        Value::Object(map) => map,
        Value::Null => Document::new(),
        other => return other,
    };
    for (k, v) in defaults {
        let missing = map.get(k).map_or(true, Value::is_null);
        if missing {
            map.insert(k.clone(), v.clone());
        }
    }
    Value::Object(map)
}

#[async_trait]
impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(p)| p)
            .unwrap_or_default();
        let Query(query) = Query::<QueryParams>::from_request_parts(&mut parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let filter_obj = parts.extensions.get::<FilterObj>().cloned();
        let defaults = parts.extensions.get::<BodyDefaults>().cloned().unwrap_or_default();

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
                _ => AppError::BadRequest(e.body_text()),
            })?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?
        };

        Ok(RequestContext {
            params,
            query,
            body: apply_defaults(body, &defaults.0),
            filter_obj,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;
    use serde_json::json;

    #[tokio::test]
    async fn reads_query_and_json_body() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/things?price%5Bgte%5D=10&keyword=lamp")
            .body(Body::from(r#"{"title":"Desk lamp"}"#))
            .unwrap();
        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert_eq!(ctx.query.get("price[gte]").map(String::as_str), Some("10"));
        assert_eq!(ctx.query.get("keyword").map(String::as_str), Some("lamp"));
        assert_eq!(ctx.body, json!({ "title": "Desk lamp" }));
        assert!(ctx.filter_obj.is_none());
        assert!(ctx.id().is_err());
    }

    #[tokio::test]
    async fn empty_body_is_null_and_bad_json_is_rejected() {
        let req = http::Request::builder().uri("/").body(Body::empty()).unwrap();
        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert_eq!(ctx.body, Value::Null);

        let req = http::Request::builder().uri("/").body(Body::from("{nope")).unwrap();
        let err = RequestContext::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.starts_with("invalid JSON body")));
    }

    #[tokio::test]
    async fn extensions_provide_scope_and_body_defaults() {
        let mut defaults = Document::new();
        defaults.insert("category".into(), json!("c1"));
        let scope = Filter::new().and(crate::query::Condition::eq("category", json!("c1")));
        let mut req = http::Request::builder()
            .uri("/")
            .body(Body::from(r#"{"title":"x","category":null}"#))
            .unwrap();
        req.extensions_mut().insert(FilterObj(scope.clone()));
        req.extensions_mut().insert(BodyDefaults(defaults));
        let ctx = RequestContext::from_request(req, &()).await.unwrap();
        assert_eq!(ctx.scope(), scope);
        assert_eq!(ctx.body, json!({ "title": "x", "category": "c1" }));
    }

    #[test]
    fn client_values_win_over_defaults() {
        let mut defaults = Document::new();
        defaults.insert("category".into(), json!("c1"));
        let body = apply_defaults(json!({ "category": "c2" }), &defaults);
        assert_eq!(body, json!({ "category": "c2" }));
        assert_eq!(apply_defaults(Value::Null, &defaults), json!({ "category": "c1" }));
    }
}
