//! Domain entities mirrored from persistent storage.
//!
//! Reaction membership is stored as the two per-kind sets only; like and
//! dislike counts are derived from set length at the presentation boundary
//! and never persisted.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::reactions::ReactionState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: String,
    pub body: String,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    pub created_at: OffsetDateTime,
}

impl PostRecord {
    pub fn reaction_state(&self, user_id: &str) -> Result<ReactionState, DomainError> {
        ReactionState::from_sets(
            self.liked_by.iter().any(|id| id == user_id),
            self.disliked_by.iter().any(|id| id == user_id),
        )
    }
}

impl CommentRecord {
    pub fn reaction_state(&self, user_id: &str) -> Result<ReactionState, DomainError> {
        ReactionState::from_sets(
            self.liked_by.iter().any(|id| id == user_id),
            self.disliked_by.iter().any(|id| id == user_id),
        )
    }
}
