//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::reactions::{ReactionKind, ReactionState};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 50;

/// Numbered page request. Pages start at 1; out-of-range values are clamped
/// rather than rejected so that listing URLs stay cacheable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * (self.per_page as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.per_page as u64).max(1);
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
    pub author_id: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: String,
    pub body: String,
}

/// Result of a reaction mutation: the stored record after the change, plus
/// the caller's state before and after it.
#[derive(Debug, Clone)]
pub struct ReactionOutcome<T> {
    pub record: T,
    pub previous: ReactionState,
    pub state: ReactionState,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    /// Applies one reaction toggle atomically: activating, clearing, or
    /// swapping sides in a single storage operation.
    async fn toggle_post_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, RepoError>;

    /// Removes an explicit reaction. Fails with `InvalidInput` when the user
    /// holds no such reaction.
    async fn retract_post_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for one post, oldest first. Fails with `NotFound` when the
    /// post itself does not exist.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn toggle_comment_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, RepoError>;

    async fn retract_comment_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, RepoError>;
}
