//! Like / dislike / view transitions.
//!
//! Each blog, comment and reply carries three sets of user ids. This module
//! holds the transition table over those sets; the content store applies it
//! while holding the target entity's lock, so every transition is one
//! serialized read-modify-write.
//!
//! | action  | state        | effect                        | message                |
//! |---------|--------------|-------------------------------|------------------------|
//! | like    | liked        | remove from likes             | "removed your like"    |
//! | like    | disliked     | move dislikes -> likes        | "added your like"      |
//! | like    | neither      | add to likes                  | "added your like"      |
//! | dislike | disliked     | remove from dislikes          | "removed your dislike" |
//! | dislike | liked        | move likes -> dislikes        | "added your dislike"   |
//! | dislike | neither      | add to dislikes               | "added your dislike"   |
//! | view    | viewer       | nothing                       | "already viewed"       |
//! | view    | not a viewer | add to viewers                | "added view"           |
//!
//! Like and dislike also add the user to the viewers set.

use crate::error::BlogError;
use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Interaction requested by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Dislike,
    View,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Like, Action::Dislike, Action::View];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Like => "like",
            Action::Dislike => "dislike",
            Action::View => "view",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = BlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Action::Like),
            "dislike" => Ok(Action::Dislike),
            "view" => Ok(Action::View),
            other => Err(BlogError::InvalidAction(other.to_string())),
        }
    }
}

/// What a transition did, reported back to the caller as a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    LikeRemoved,
    LikeAdded,
    DislikeRemoved,
    DislikeAdded,
    AlreadyViewed,
    ViewAdded,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::LikeRemoved => "removed your like",
            Outcome::LikeAdded => "added your like",
            Outcome::DislikeRemoved => "removed your dislike",
            Outcome::DislikeAdded => "added your dislike",
            Outcome::AlreadyViewed => "already viewed",
            Outcome::ViewAdded => "added view",
        }
    }

    /// False only for the no-op view.
    pub fn changed_state(&self) -> bool {
        !matches!(self, Outcome::AlreadyViewed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The per-entity interaction sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    pub likes: BTreeSet<EntityId>,
    pub dislikes: BTreeSet<EntityId>,
    pub viewers: BTreeSet<EntityId>,
}

impl Interactions {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn dislike_count(&self) -> usize {
        self.dislikes.len()
    }

    pub fn view_count(&self) -> usize {
        self.viewers.len()
    }

    /// Applies one transition for `user`.
    pub fn apply(&mut self, user: EntityId, action: Action) -> Outcome {
        match action {
            Action::Like => {
                let outcome = if self.likes.remove(&user) {
                    Outcome::LikeRemoved
                } else {
                    self.dislikes.remove(&user);
                    self.likes.insert(user);
                    Outcome::LikeAdded
                };
                self.viewers.insert(user);
                outcome
            }
            Action::Dislike => {
                let outcome = if self.dislikes.remove(&user) {
                    Outcome::DislikeRemoved
                } else {
                    self.likes.remove(&user);
                    self.dislikes.insert(user);
                    Outcome::DislikeAdded
                };
                self.viewers.insert(user);
                outcome
            }
            Action::View => {
                if self.viewers.insert(user) {
                    Outcome::ViewAdded
                } else {
                    Outcome::AlreadyViewed
                }
            }
        }
    }

    /// Checks that no user both likes and dislikes, and that everyone who
    /// reacted also counts as a viewer.
    pub fn is_consistent(&self) -> bool {
        self.likes.is_disjoint(&self.dislikes)
            && self.likes.is_subset(&self.viewers)
            && self.dislikes.is_subset(&self.viewers)
    }
}

/// Anything that carries interaction sets.
pub trait Interactive {
    fn interactions(&self) -> &Interactions;
    fn interactions_mut(&mut self) -> &mut Interactions;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    #[test]
    fn test_parse_action() {
        assert_eq!("like".parse::<Action>().unwrap(), Action::Like);
        assert_eq!("dislike".parse::<Action>().unwrap(), Action::Dislike);
        assert_eq!("view".parse::<Action>().unwrap(), Action::View);
        assert!(matches!(
            "Like".parse::<Action>(),
            Err(BlogError::InvalidAction(_))
        ));
        assert!(matches!(
            "share".parse::<Action>(),
            Err(BlogError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_like_toggles() {
        let mut sets = Interactions::default();
        let user = EntityId::new();

        assert_eq!(sets.apply(user, Action::Like), Outcome::LikeAdded);
        assert!(sets.likes.contains(&user));
        assert!(sets.viewers.contains(&user));

        assert_eq!(sets.apply(user, Action::Like), Outcome::LikeRemoved);
        assert!(sets.likes.is_empty());
        // Viewing is never undone.
        assert!(sets.viewers.contains(&user));
    }

    #[test]
    fn test_dislike_replaces_like() {
        let mut sets = Interactions::default();
        let user = EntityId::new();

        sets.apply(user, Action::Like);
        assert_eq!(sets.apply(user, Action::Dislike), Outcome::DislikeAdded);
        assert!(sets.likes.is_empty());
        assert_eq!(sets.dislikes.len(), 1);

        assert_eq!(sets.apply(user, Action::Like), Outcome::LikeAdded);
        assert!(sets.dislikes.is_empty());
        assert_eq!(sets.likes.len(), 1);

        sets.apply(user, Action::Dislike);
        assert_eq!(sets.apply(user, Action::Dislike), Outcome::DislikeRemoved);
        assert!(sets.dislikes.is_empty());
    }

    #[test]
    fn test_view_is_idempotent() {
        let mut sets = Interactions::default();
        let user = EntityId::new();

        assert_eq!(sets.apply(user, Action::View), Outcome::ViewAdded);
        for _ in 0..5 {
            let outcome = sets.apply(user, Action::View);
            assert_eq!(outcome.message(), "already viewed");
            assert!(!outcome.changed_state());
        }
        assert_eq!(sets.view_count(), 1);
        assert!(sets.likes.is_empty() && sets.dislikes.is_empty());
    }

    #[test]
    fn test_like_after_view_keeps_single_viewer() {
        let mut sets = Interactions::default();
        let user = EntityId::new();
        sets.apply(user, Action::View);
        sets.apply(user, Action::Like);
        assert_eq!(sets.view_count(), 1);
    }

    /// Random sequences never break the set invariants and never shrink viewers.
    #[test]
    fn test_random_sequences_keep_invariants() {
        let mut rng = rand::thread_rng();
        let users: Vec<EntityId> = (0..6).map(|_| EntityId::new()).collect();

        for _ in 0..200 {
            let mut sets = Interactions::default();
            let mut viewers_seen = 0;
            for _ in 0..rng.gen_range(1..60) {
                let user = *users.choose(&mut rng).unwrap();
                let action = *Action::ALL.choose(&mut rng).unwrap();
                sets.apply(user, action);

                assert!(sets.is_consistent());
                assert!(sets.view_count() >= viewers_seen);
                viewers_seen = sets.view_count();
            }
        }
    }
}
