//! Comment listing, creation, and reaction toggles. Mutations invalidate the
//! cached comment listing for the owning post.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::posts::ensure_non_empty;
use crate::application::repos::{CommentsRepo, CreateCommentParams, ReactionOutcome};
use crate::cache::CacheInvalidator;
use crate::domain::entities::CommentRecord;
use crate::domain::reactions::ReactionKind;

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub post_id: Uuid,
    pub body: String,
}

#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn CommentsRepo>,
    invalidator: Arc<CacheInvalidator>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentsRepo>, invalidator: Arc<CacheInvalidator>) -> Self {
        Self { repo, invalidator }
    }

    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, AppError> {
        Ok(self.repo.list_comments(post_id).await?)
    }

    pub async fn create(
        &self,
        author_id: &str,
        command: CreateCommentCommand,
    ) -> Result<CommentRecord, AppError> {
        ensure_non_empty(&command.body, "body")?;

        let comment = self
            .repo
            .create_comment(CreateCommentParams {
                post_id: command.post_id,
                author_id: author_id.to_string(),
                body: command.body,
            })
            .await?;

        self.invalidator.invalidate_comments(comment.post_id).await;
        Ok(comment)
    }

    pub async fn toggle_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, AppError> {
        let outcome = self.repo.toggle_comment_reaction(id, user_id, kind).await?;
        self.invalidator
            .invalidate_comments(outcome.record.post_id)
            .await;
        Ok(outcome)
    }

    pub async fn retract_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, AppError> {
        let outcome = self
            .repo
            .retract_comment_reaction(id, user_id, kind)
            .await?;
        self.invalidator
            .invalidate_comments(outcome.record.post_id)
            .await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{CreatePostParams, PostsRepo, RepoError};
    use crate::cache::{CacheStore, MemoryBackend};
    use crate::infra::db::MemoryRepositories;

    async fn setup() -> (CommentService, Uuid) {
        let store = Arc::new(CacheStore::new(Arc::new(MemoryBackend::new()), true));
        store.connect().await;
        let repos = Arc::new(MemoryRepositories::new());
        let post = repos
            .create_post(CreatePostParams {
                title: "post".into(),
                body: "body".into(),
                author_id: "author".into(),
            })
            .await
            .unwrap();
        let service = CommentService::new(repos, Arc::new(CacheInvalidator::new(store)));
        (service, post.id)
    }

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let (service, post_id) = setup().await;
        service
            .create(
                "u1",
                CreateCommentCommand {
                    post_id,
                    body: "first".into(),
                },
            )
            .await
            .unwrap();

        let comments = service.list_for_post(post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "first");
    }

    #[tokio::test]
    async fn listing_an_unknown_post_is_not_found() {
        let (service, _) = setup().await;
        let result = service.list_for_post(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Repo(RepoError::NotFound))));
    }
}
