//! Standard success envelope helpers.

use crate::query::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{status, data?, message?, results?, pagination?}`; `status` is always `"success"`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn success() -> Self {
        Envelope {
            status: "success",
            results: None,
            pagination: None,
            message: None,
            data: None,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            data: Some(data),
            ..Envelope::success()
        }),
    )
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            data: Some(data),
            ..Envelope::success()
        }),
    )
}

pub fn success_message(message: impl Into<String>) -> (StatusCode, Json<Envelope<()>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            message: Some(message.into()),
            ..Envelope::success()
        }),
    )
}

pub fn success_page<T: Serialize>(data: Vec<T>, pagination: Pagination) -> (StatusCode, Json<Envelope<Vec<T>>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            results: Some(data.len()),
            pagination: Some(pagination),
            data: Some(data),
            ..Envelope::success()
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_envelope_has_no_data() {
        let (status, Json(body)) = success_message("Document deleted successfully");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "status": "success", "message": "Document deleted successfully" })
        );
    }

    #[test]
    fn page_envelope_counts_returned_documents() {
        let (_, Json(body)) = success_page(vec![json!({"a": 1}), json!({"a": 2})], Pagination::compute(1, 2, 7));
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["results"], 2);
        assert_eq!(v["pagination"]["total"], 7);
        assert_eq!(v["data"].as_array().unwrap().len(), 2);
    }
}
