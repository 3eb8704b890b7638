//! Comments handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::comments::CreateCommentCommand;
use crate::domain::reactions::ReactionKind;
use crate::infra::http::middleware::Principal;

use super::app_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{CommentCreateRequest, CommentResponse, ReactionResponse};
use crate::infra::http::api::state::ApiState;

pub async fn list_comments(
    State(state): State<ApiState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .comments
        .list_for_post(post_id)
        .await
        .map_err(app_to_api)?;

    let items: Vec<CommentResponse> = comments.iter().map(CommentResponse::from).collect();
    Ok(Json(items))
}

pub async fn create_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .create(
            &principal.user_id,
            CreateCommentCommand {
                post_id,
                body: payload.body,
            },
        )
        .await
        .map_err(app_to_api)?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(&comment))))
}

pub async fn like_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle_comment(state, principal, id, ReactionKind::Like).await
}

pub async fn dislike_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle_comment(state, principal, id, ReactionKind::Dislike).await
}

pub async fn unlike_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    retract_comment(state, principal, id, ReactionKind::Like).await
}

pub async fn undislike_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    retract_comment(state, principal, id, ReactionKind::Dislike).await
}

async fn toggle_comment(
    state: ApiState,
    principal: Principal,
    id: Uuid,
    kind: ReactionKind,
) -> Result<Json<ReactionResponse>, ApiError> {
    let outcome = state
        .comments
        .toggle_reaction(id, &principal.user_id, kind)
        .await
        .map_err(app_to_api)?;

    Ok(Json(ReactionResponse::new(
        outcome.state,
        &outcome.record.liked_by,
        &outcome.record.disliked_by,
    )))
}

async fn retract_comment(
    state: ApiState,
    principal: Principal,
    id: Uuid,
    kind: ReactionKind,
) -> Result<Json<ReactionResponse>, ApiError> {
    let outcome = state
        .comments
        .retract_reaction(id, &principal.user_id, kind)
        .await
        .map_err(app_to_api)?;

    Ok(Json(ReactionResponse::new(
        outcome.state,
        &outcome.record.liked_by,
        &outcome.record.disliked_by,
    )))
}
