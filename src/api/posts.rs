//! Post and backend handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState, RequestContext};
use crate::backend::BackendInfo;
use crate::model::{NewPost, Post, PostPatch};
use crate::pagination::{PageRequest, PaginatedEnvelope};

/// `GET /api/posts` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub next_token: Option<String>,
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(super) async fn database_info(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Json<BackendInfo> {
    Json(BackendInfo::describe(ctx.directive, &state.storage))
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedEnvelope<Post>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text(), &ctx.path))?;
    let page = PageRequest::new(query.limit, query.next_token);

    state
        .service
        .list(ctx.directive, &page)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, &ctx.path))
}

pub(super) async fn get_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    state
        .service
        .get(ctx.directive, &id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, &ctx.path))
}

pub(super) async fn create_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(input) = body.map_err(|e| ApiError::bad_request(e.body_text(), &ctx.path))?;

    let post = state
        .service
        .create(ctx.directive, input)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.path))?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub(super) async fn update_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Result<Json<PostPatch>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let Json(patch) = body.map_err(|e| ApiError::bad_request(e.body_text(), &ctx.path))?;

    state
        .service
        .update(ctx.directive, &id, patch)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, &ctx.path))
}

pub(super) async fn delete_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete(ctx.directive, &id)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.path))?;

    Ok(StatusCode::NO_CONTENT)
}
