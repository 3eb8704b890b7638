//! Post reads, writes, and reaction toggles. Every mutation finishes by
//! firing response-cache invalidation, which never fails the request.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{
    CreatePostParams, Page, PageRequest, PostsRepo, ReactionOutcome, UpdatePostParams,
};
use crate::cache::CacheInvalidator;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::reactions::ReactionKind;

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostsRepo>,
    invalidator: Arc<CacheInvalidator>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostsRepo>, invalidator: Arc<CacheInvalidator>) -> Self {
        Self { repo, invalidator }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<PostRecord>, AppError> {
        Ok(self.repo.list_posts(page).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<PostRecord, AppError> {
        self.repo
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post").into())
    }

    pub async fn create(
        &self,
        author_id: &str,
        command: CreatePostCommand,
    ) -> Result<PostRecord, AppError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.body, "body")?;

        let post = self
            .repo
            .create_post(CreatePostParams {
                title: command.title,
                body: command.body,
                author_id: author_id.to_string(),
            })
            .await?;

        self.invalidator.invalidate_post(post.id).await;
        Ok(post)
    }

    pub async fn update(&self, command: UpdatePostCommand) -> Result<PostRecord, AppError> {
        if let Some(title) = &command.title {
            ensure_non_empty(title, "title")?;
        }
        if let Some(body) = &command.body {
            ensure_non_empty(body, "body")?;
        }

        let post = self
            .repo
            .update_post(UpdatePostParams {
                id: command.id,
                title: command.title,
                body: command.body,
            })
            .await?;

        self.invalidator.invalidate_post(post.id).await;
        Ok(post)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.repo.delete_post(id).await?;
        self.invalidator.invalidate_post(id).await;
        self.invalidator.invalidate_comments(id).await;
        Ok(())
    }

    pub async fn toggle_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, AppError> {
        let outcome = self.repo.toggle_post_reaction(id, user_id, kind).await?;
        self.invalidator.invalidate_post(id).await;
        Ok(outcome)
    }

    pub async fn retract_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, AppError> {
        let outcome = self.repo.retract_post_reaction(id, user_id, kind).await?;
        self.invalidator.invalidate_post(id).await;
        Ok(outcome)
    }
}

pub(crate) fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")).into());
    }
    Ok(())
}
