//! API handlers organized by resource type.
//!
//! Each submodule contains handlers for a specific resource. Helper functions
//! for error conversion are defined here and shared across modules.

mod chat;
mod comments;
mod health;
mod posts;

pub use chat::*;
pub use comments::*;
pub use health::*;
pub use posts::*;

// ----- Shared query structs -----

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// ----- Shared error conversions -----

use axum::http::StatusCode;

use crate::application::chat::ChatError;
use crate::application::error::AppError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn app_to_api(err: AppError) -> ApiError {
    match err {
        AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
            ApiError::not_found("resource not found")
        }
        AppError::Domain(DomainError::Validation { message })
        | AppError::Repo(RepoError::InvalidInput { message }) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        AppError::Domain(DomainError::Invariant { message })
        | AppError::Repo(RepoError::Persistence(message)) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Persistence error",
            Some(message),
        ),
        AppError::Infra(err) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Internal error",
            Some(err.to_string()),
        ),
        AppError::Unexpected(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Unexpected error",
            Some(message),
        ),
    }
}

pub(crate) fn chat_to_api(err: ChatError) -> ApiError {
    match err {
        ChatError::EmptyMessage => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid message",
            Some("message must not be empty".to_string()),
        ),
        ChatError::RateLimited => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::RATE_LIMITED,
            "Message rate limit exceeded",
            Some("wait for the current window to pass".to_string()),
        ),
        ChatError::Responder(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Chat responder failed",
            Some(message),
        ),
    }
}
