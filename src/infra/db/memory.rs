//! DashMap-backed repositories. The durable document store behind a real
//! deployment is a separate collaborator; this adapter is the process-local
//! boundary implementation the server and its tests run against.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, Page, PageRequest, PostsRepo,
    ReactionOutcome, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::reactions::{ReactionKind, ReactionTransition};

#[derive(Default)]
pub struct MemoryRepositories {
    posts: DashMap<Uuid, PostRecord>,
    comments: DashMap<Uuid, CommentRecord>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn domain_to_repo(err: DomainError) -> RepoError {
    match err {
        DomainError::NotFound { .. } => RepoError::NotFound,
        DomainError::Validation { message } => RepoError::InvalidInput { message },
        DomainError::Invariant { message } => RepoError::Persistence(message),
    }
}

/// Applies both halves of a reaction transition to the membership sets.
/// Callers hold the map entry lock, so the removal and insertion land as one
/// storage operation.
fn apply_transition(
    liked_by: &mut Vec<String>,
    disliked_by: &mut Vec<String>,
    user_id: &str,
    transition: &ReactionTransition,
) {
    if let Some(kind) = transition.remove {
        let set = match kind {
            ReactionKind::Like => &mut *liked_by,
            ReactionKind::Dislike => &mut *disliked_by,
        };
        set.retain(|member| member != user_id);
    }
    if let Some(kind) = transition.add {
        let set = match kind {
            ReactionKind::Like => liked_by,
            ReactionKind::Dislike => disliked_by,
        };
        if !set.iter().any(|member| member == user_id) {
            set.push(user_id.to_string());
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError> {
        let mut posts: Vec<PostRecord> = self.posts.iter().map(|entry| entry.value().clone()).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = posts.len() as u64;
        let items = posts
            .into_iter()
            .skip(page.offset())
            .take(page.per_page as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.posts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            body: params.body,
            author_id: params.author_id,
            liked_by: Vec::new(),
            disliked_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut entry = self.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        if let Some(title) = params.title {
            record.title = title;
        }
        if let Some(body) = params.body {
            record.body = body;
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts.remove(&id).ok_or(RepoError::NotFound)?;
        self.comments.retain(|_, comment| comment.post_id != id);
        Ok(())
    }

    async fn toggle_post_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, RepoError> {
        let mut entry = self.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        let previous = record.reaction_state(user_id).map_err(domain_to_repo)?;
        let transition = previous.toggle(kind);
        apply_transition(
            &mut record.liked_by,
            &mut record.disliked_by,
            user_id,
            &transition,
        );
        record.updated_at = OffsetDateTime::now_utc();
        Ok(ReactionOutcome {
            record: record.clone(),
            previous,
            state: transition.next,
        })
    }

    async fn retract_post_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<PostRecord>, RepoError> {
        let mut entry = self.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        let previous = record.reaction_state(user_id).map_err(domain_to_repo)?;
        let transition = previous.retract(kind).map_err(domain_to_repo)?;
        apply_transition(
            &mut record.liked_by,
            &mut record.disliked_by,
            user_id,
            &transition,
        );
        record.updated_at = OffsetDateTime::now_utc();
        Ok(ReactionOutcome {
            record: record.clone(),
            previous,
            state: transition.next,
        })
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        if !self.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        let mut comments: Vec<CommentRecord> = self
            .comments
            .iter()
            .filter(|entry| entry.post_id == post_id)
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        if !self.posts.contains_key(&params.post_id) {
            return Err(RepoError::NotFound);
        }
        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            body: params.body,
            liked_by: Vec::new(),
            disliked_by: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn toggle_comment_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, RepoError> {
        let mut entry = self.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        let previous = record.reaction_state(user_id).map_err(domain_to_repo)?;
        let transition = previous.toggle(kind);
        apply_transition(
            &mut record.liked_by,
            &mut record.disliked_by,
            user_id,
            &transition,
        );
        Ok(ReactionOutcome {
            record: record.clone(),
            previous,
            state: transition.next,
        })
    }

    async fn retract_comment_reaction(
        &self,
        id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome<CommentRecord>, RepoError> {
        let mut entry = self.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        let previous = record.reaction_state(user_id).map_err(domain_to_repo)?;
        let transition = previous.retract(kind).map_err(domain_to_repo)?;
        apply_transition(
            &mut record.liked_by,
            &mut record.disliked_by,
            user_id,
            &transition,
        );
        Ok(ReactionOutcome {
            record: record.clone(),
            previous,
            state: transition.next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reactions::ReactionState;

    async fn seeded_post(repos: &MemoryRepositories) -> PostRecord {
        repos
            .create_post(CreatePostParams {
                title: "title".into(),
                body: "body".into(),
                author_id: "author".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn toggling_the_other_side_swaps_in_one_operation() {
        let repos = MemoryRepositories::new();
        let post = seeded_post(&repos).await;

        let liked = repos
            .toggle_post_reaction(post.id, "u1", ReactionKind::Like)
            .await
            .unwrap();
        assert_eq!(liked.state, ReactionState::Liked);
        assert_eq!(liked.record.liked_by, vec!["u1".to_string()]);

        let swapped = repos
            .toggle_post_reaction(post.id, "u1", ReactionKind::Dislike)
            .await
            .unwrap();
        assert_eq!(swapped.previous, ReactionState::Liked);
        assert_eq!(swapped.state, ReactionState::Disliked);
        assert!(swapped.record.liked_by.is_empty());
        assert_eq!(swapped.record.disliked_by, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn toggling_twice_returns_to_no_reaction() {
        let repos = MemoryRepositories::new();
        let post = seeded_post(&repos).await;

        repos
            .toggle_post_reaction(post.id, "u1", ReactionKind::Like)
            .await
            .unwrap();
        let cleared = repos
            .toggle_post_reaction(post.id, "u1", ReactionKind::Like)
            .await
            .unwrap();

        assert_eq!(cleared.previous, ReactionState::Liked);
        assert_eq!(cleared.state, ReactionState::None);
        assert!(cleared.record.liked_by.is_empty());
        assert!(cleared.record.disliked_by.is_empty());
    }

    #[tokio::test]
    async fn retracting_an_absent_reaction_reports_invalid_input() {
        let repos = MemoryRepositories::new();
        let post = seeded_post(&repos).await;

        let result = repos
            .retract_post_reaction(post.id, "u1", ReactionKind::Like)
            .await;
        match result {
            Err(RepoError::InvalidInput { message }) => {
                assert_eq!(message, "you have not liked this");
            }
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_pages_newest_first() {
        let repos = MemoryRepositories::new();
        for i in 0..3 {
            repos
                .create_post(CreatePostParams {
                    title: format!("post {i}"),
                    body: "body".into(),
                    author_id: "author".into(),
                })
                .await
                .unwrap();
        }

        let page = repos.list_posts(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title, "post 2");

        let last = repos.list_posts(PageRequest::new(2, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].title, "post 0");
    }

    #[tokio::test]
    async fn comments_stay_scoped_to_their_post() {
        let repos = MemoryRepositories::new();
        let first = seeded_post(&repos).await;
        let second = seeded_post(&repos).await;

        repos
            .create_comment(CreateCommentParams {
                post_id: first.id,
                author_id: "u1".into(),
                body: "on first".into(),
            })
            .await
            .unwrap();

        assert_eq!(repos.list_comments(first.id).await.unwrap().len(), 1);
        assert!(repos.list_comments(second.id).await.unwrap().is_empty());
        assert!(matches!(
            repos.list_comments(Uuid::new_v4()).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_a_post_drops_its_comments() {
        let repos = MemoryRepositories::new();
        let post = seeded_post(&repos).await;
        let comment = repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: "u1".into(),
                body: "gone soon".into(),
            })
            .await
            .unwrap();

        repos.delete_post(post.id).await.unwrap();

        assert!(
            repos
                .toggle_comment_reaction(comment.id, "u1", ReactionKind::Like)
                .await
                .is_err()
        );
    }
}
