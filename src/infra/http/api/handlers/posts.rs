//! Posts handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::posts::{CreatePostCommand, UpdatePostCommand};
use crate::application::repos::{DEFAULT_PER_PAGE, PageRequest};
use crate::domain::reactions::ReactionKind;
use crate::infra::http::middleware::Principal;

use super::{PostListQuery, app_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    PostCreateRequest, PostListResponse, PostResponse, PostUpdateRequest, ReactionResponse,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );
    let page = state.posts.list(request).await.map_err(app_to_api)?;
    Ok(Json(PostListResponse::from(page)))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.get(id).await.map_err(app_to_api)?;
    Ok(Json(PostResponse::from(&post)))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .posts
        .create(
            &principal.user_id,
            CreatePostCommand {
                title: payload.title,
                body: payload.body,
            },
        )
        .await
        .map_err(app_to_api)?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(&post))))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .posts
        .update(UpdatePostCommand {
            id,
            title: payload.title,
            body: payload.body,
        })
        .await
        .map_err(app_to_api)?;

    Ok(Json(PostResponse::from(&post)))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete(id).await.map_err(app_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle_post(state, principal, id, ReactionKind::Like).await
}

pub async fn dislike_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle_post(state, principal, id, ReactionKind::Dislike).await
}

pub async fn unlike_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    retract_post(state, principal, id, ReactionKind::Like).await
}

pub async fn undislike_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    retract_post(state, principal, id, ReactionKind::Dislike).await
}

async fn toggle_post(
    state: ApiState,
    principal: Principal,
    id: Uuid,
    kind: ReactionKind,
) -> Result<Json<ReactionResponse>, ApiError> {
    let outcome = state
        .posts
        .toggle_reaction(id, &principal.user_id, kind)
        .await
        .map_err(app_to_api)?;

    Ok(Json(ReactionResponse::new(
        outcome.state,
        &outcome.record.liked_by,
        &outcome.record.disliked_by,
    )))
}

async fn retract_post(
    state: ApiState,
    principal: Principal,
    id: Uuid,
    kind: ReactionKind,
) -> Result<Json<ReactionResponse>, ApiError> {
    let outcome = state
        .posts
        .retract_reaction(id, &principal.user_id, kind)
        .await
        .map_err(app_to_api)?;

    Ok(Json(ReactionResponse::new(
        outcome.state,
        &outcome.record.liked_by,
        &outcome.record.disliked_by,
    )))
}
