//! Handler factory: each function takes a model and returns an axum handler bound to it.

use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::query::Population;
use crate::response::{success_created, success_message, success_one, success_page};
use crate::service::CrudService;
use crate::store::DocumentStore;
use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

pub type HandlerFuture = BoxFuture<'static, Result<Response, AppError>>;

pub fn delete_one<M>(model: Arc<M>) -> impl Fn(RequestContext) -> HandlerFuture + Clone + Send + Sync + 'static
where
    M: DocumentStore + ?Sized + 'static,
{
    move |ctx| delete(Arc::clone(&model), ctx).boxed()
}

pub fn update_one<M>(model: Arc<M>) -> impl Fn(RequestContext) -> HandlerFuture + Clone + Send + Sync + 'static
where
    M: DocumentStore + ?Sized + 'static,
{
    move |ctx| update(Arc::clone(&model), ctx).boxed()
}

pub fn create_one<M>(model: Arc<M>) -> impl Fn(RequestContext) -> HandlerFuture + Clone + Send + Sync + 'static
where
    M: DocumentStore + ?Sized + 'static,
{
    move |ctx| create(Arc::clone(&model), ctx).boxed()
}

/// `populate` expands reference fields of the returned document.
pub fn get_one<M>(
    model: Arc<M>,
    populate: Option<Vec<Population>>,
) -> impl Fn(RequestContext) -> HandlerFuture + Clone + Send + Sync + 'static
where
    M: DocumentStore + ?Sized + 'static,
{
    let populate: Arc<[Population]> = populate.unwrap_or_default().into();
    move |ctx| read(Arc::clone(&model), Arc::clone(&populate), ctx).boxed()
}

/// `model_name` selects the collection's own search fields for `keyword`; without it only
/// `name` is searched.
pub fn get_all<M>(
    model: Arc<M>,
    model_name: Option<&str>,
) -> impl Fn(RequestContext) -> HandlerFuture + Clone + Send + Sync + 'static
where
    M: DocumentStore + ?Sized + 'static,
{
    let search_fields: Arc<[String]> = CrudService::search_fields(model.as_ref(), model_name).into();
    move |ctx| list(Arc::clone(&model), Arc::clone(&search_fields), ctx).boxed()
}

async fn delete<M: DocumentStore + ?Sized>(model: Arc<M>, ctx: RequestContext) -> Result<Response, AppError> {
    CrudService::delete(model.as_ref(), ctx.id()?).await?;
    Ok(success_message("Document deleted successfully").into_response())
}

async fn update<M: DocumentStore + ?Sized>(model: Arc<M>, ctx: RequestContext) -> Result<Response, AppError> {
    let id = ctx.id()?.to_string();
    let doc = CrudService::update(model.as_ref(), &id, ctx.body).await?;
    Ok(success_one(doc).into_response())
}

async fn create<M: DocumentStore + ?Sized>(model: Arc<M>, ctx: RequestContext) -> Result<Response, AppError> {
    let doc = CrudService::create(model.as_ref(), ctx.body).await?;
    Ok(success_created(doc).into_response())
}

async fn read<M: DocumentStore + ?Sized>(
    model: Arc<M>,
    populate: Arc<[Population]>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let doc = CrudService::read(model.as_ref(), ctx.id()?, &populate).await?;
    Ok(success_one(doc).into_response())
}

async fn list<M: DocumentStore + ?Sized>(
    model: Arc<M>,
    search_fields: Arc<[String]>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let page = CrudService::list(model.as_ref(), ctx.scope(), &ctx.query, &search_fields).await?;
    Ok(success_page(page.documents, page.pagination).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionSchema, FieldSchema, FieldType};
    use crate::store::{MemoryDatabase, MemoryStore};
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn model() -> Arc<MemoryStore> {
        let mut title = FieldSchema::new("title", FieldType::String);
        title.rules.required = Some(true);
        Arc::new(MemoryDatabase::new().collection(CollectionSchema::new(
            "notes",
            "notes",
            vec![title, FieldSchema::new("rank", FieldType::Integer)],
        )))
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_delete_envelopes() {
        let model = model();
        let res = create_one(model.clone())(RequestContext::new().with_body(json!({ "title": "a" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["status"], "success");
        let id = created["data"]["_id"].as_str().unwrap().to_string();

        let res = delete_one(model.clone())(RequestContext::new().with_id(&id)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "status": "success", "message": "Document deleted successfully" })
        );

        let err = get_one(model, None)(RequestContext::new().with_id(&id)).await.unwrap_err();
        assert_eq!(err.to_string(), format!("No document found for this id: {}", id));
    }

    #[tokio::test]
    async fn get_all_reports_results_and_pagination() {
        let model = model();
        let create = create_one(model.clone());
        for i in 0..3 {
            create(RequestContext::new().with_body(json!({ "title": format!("t{i}"), "rank": i })))
                .await
                .unwrap();
        }
        let res = get_all(model, Some("notes"))(RequestContext::new().with_query("limit", "2").with_query("sort", "rank"))
            .await
            .unwrap();
        let body = body_json(res).await;
        assert_eq!(body["results"], 2);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["numberOfPages"], 2);
        assert_eq!(body["data"][0]["rank"], 0);
    }

    #[tokio::test]
    async fn update_without_id_is_bad_request() {
        let err = update_one(model())(RequestContext::new().with_body(json!({}))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
