use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::Page;
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::reactions::ReactionState;

#[derive(Debug, Deserialize, Serialize)]
pub struct PostCreateRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostUpdateRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentCreateRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatMessageRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    pub reply: String,
    pub cached: bool,
}

/// Post as the API exposes it. Reaction counts are always derived from the
/// membership arrays, never stored separately.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub likes: u64,
    pub dislikes: u64,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&PostRecord> for PostResponse {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            body: record.body.clone(),
            author_id: record.author_id.clone(),
            likes: record.liked_by.len() as u64,
            dislikes: record.disliked_by.len() as u64,
            liked_by: record.liked_by.clone(),
            disliked_by: record.disliked_by.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub items: Vec<PostResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl From<Page<PostRecord>> for PostListResponse {
    fn from(page: Page<PostRecord>) -> Self {
        Self {
            items: page.items.iter().map(PostResponse::from).collect(),
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: String,
    pub body: String,
    pub likes: u64,
    pub dislikes: u64,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&CommentRecord> for CommentResponse {
    fn from(record: &CommentRecord) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            author_id: record.author_id.clone(),
            body: record.body.clone(),
            likes: record.liked_by.len() as u64,
            dislikes: record.disliked_by.len() as u64,
            liked_by: record.liked_by.clone(),
            disliked_by: record.disliked_by.clone(),
            created_at: record.created_at,
        }
    }
}

/// Result of a reaction mutation: where the caller stands now, plus the
/// derived counts after the change.
#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub state: ReactionState,
    pub likes: u64,
    pub dislikes: u64,
}

impl ReactionResponse {
    pub fn new(state: ReactionState, liked_by: &[String], disliked_by: &[String]) -> Self {
        Self {
            state,
            likes: liked_by.len() as u64,
            dislikes: disliked_by.len() as u64,
        }
    }
}
