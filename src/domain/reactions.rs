//! Reaction toggle semantics shared by posts and comments.
//!
//! A user is in exactly one of three states per entity: no reaction, liked, or
//! disliked. Toggling the active kind clears it; toggling the other kind swaps
//! in a single transition, so the two membership sets can never overlap.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }

    fn participle(self) -> &'static str {
        match self {
            ReactionKind::Like => "liked",
            ReactionKind::Dislike => "disliked",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
    #[default]
    None,
    Liked,
    Disliked,
}

/// Membership changes that move an entity between reaction states.
///
/// `add` and `remove` describe edits to the per-kind member sets; storage
/// applies both inside one atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionTransition {
    pub next: ReactionState,
    pub add: Option<ReactionKind>,
    pub remove: Option<ReactionKind>,
}

impl ReactionState {
    /// Derives the state from set membership. Membership in both sets is
    /// corrupt data, not a reachable state.
    pub fn from_sets(liked: bool, disliked: bool) -> Result<Self, DomainError> {
        match (liked, disliked) {
            (true, true) => Err(DomainError::invariant(
                "user is in both reaction sets of one entity",
            )),
            (true, false) => Ok(ReactionState::Liked),
            (false, true) => Ok(ReactionState::Disliked),
            (false, false) => Ok(ReactionState::None),
        }
    }

    pub fn active_kind(self) -> Option<ReactionKind> {
        match self {
            ReactionState::None => None,
            ReactionState::Liked => Some(ReactionKind::Like),
            ReactionState::Disliked => Some(ReactionKind::Dislike),
        }
    }

    /// The toggle table: same kind clears, other kind swaps.
    pub fn toggle(self, kind: ReactionKind) -> ReactionTransition {
        match (self.active_kind(), kind) {
            (None, _) => ReactionTransition {
                next: state_of(kind),
                add: Some(kind),
                remove: None,
            },
            (Some(active), _) if active == kind => ReactionTransition {
                next: ReactionState::None,
                add: None,
                remove: Some(kind),
            },
            (Some(active), _) => ReactionTransition {
                next: state_of(kind),
                add: Some(kind),
                remove: Some(active),
            },
        }
    }

    /// Explicit removal of one kind. Unlike the toggle this is only legal
    /// while that kind is active.
    pub fn retract(self, kind: ReactionKind) -> Result<ReactionTransition, DomainError> {
        if self.active_kind() == Some(kind) {
            Ok(ReactionTransition {
                next: ReactionState::None,
                add: None,
                remove: Some(kind),
            })
        } else {
            Err(DomainError::validation(format!(
                "you have not {} this",
                kind.participle()
            )))
        }
    }
}

fn state_of(kind: ReactionKind) -> ReactionState {
    match kind {
        ReactionKind::Like => ReactionState::Liked,
        ReactionKind::Dislike => ReactionState::Disliked,
    }
}
