//! Chat handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;

use crate::cache::ChatEntry;
use crate::infra::http::middleware::Principal;

use super::chat_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{ChatMessageRequest, ChatMessageResponse};
use crate::infra::http::api::state::ApiState;

pub async fn send_chat_message(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .chat
        .handle_message(&principal.user_id, &payload.session_id, &payload.message)
        .await
        .map_err(chat_to_api)?;

    Ok(Json(ChatMessageResponse {
        reply: outcome.reply,
        cached: outcome.cached,
    }))
}

pub async fn get_chat_history(
    State(state): State<ApiState>,
    Extension(_principal): Extension<Principal>,
    Path(session_id): Path<String>,
) -> Json<Vec<ChatEntry>> {
    Json(state.chat.history(&session_id).await)
}
