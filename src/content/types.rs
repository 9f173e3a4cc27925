//! Blog, comment and reply records plus their query and patch inputs.

use crate::id::EntityId;
use crate::interaction::{Interactions, Interactive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default 1-based page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// A blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub interactions: Interactions,
    pub comment_count: u64,
}

/// A comment on a blog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: EntityId,
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub interactions: Interactions,
    pub reply_count: u64,
}

/// A reply to a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: EntityId,
    pub comment_id: EntityId,
    /// Denormalized from the parent comment for scope checks.
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub interactions: Interactions,
}

macro_rules! impl_interactive {
    ($($ty:ty),*) => {
        $(
            impl Interactive for $ty {
                fn interactions(&self) -> &Interactions {
                    &self.interactions
                }

                fn interactions_mut(&mut self) -> &mut Interactions {
                    &mut self.interactions
                }
            }
        )*
    };
}

impl_interactive!(Blog, Comment, Reply);

/// Addresses one interactable entity with its full parent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Blog {
        blog_id: EntityId,
    },
    Comment {
        blog_id: EntityId,
        comment_id: EntityId,
    },
    Reply {
        blog_id: EntityId,
        comment_id: EntityId,
        reply_id: EntityId,
    },
}

impl EntityRef {
    /// The id of the addressed entity itself.
    pub fn target(&self) -> &EntityId {
        match self {
            EntityRef::Blog { blog_id } => blog_id,
            EntityRef::Comment { comment_id, .. } => comment_id,
            EntityRef::Reply { reply_id, .. } => reply_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Blog { .. } => "blog",
            EntityRef::Comment { .. } => "comment",
            EntityRef::Reply { .. } => "reply",
        }
    }
}

/// Input for creating a blog. The author comes from the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBlog {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; empty fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl BlogPatch {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags
            .as_deref()
            .filter(|tags| tags.iter().any(|t| !t.trim().is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.title().is_none() && self.content().is_none() && self.tags().is_none()
    }
}

/// Partial update for comments and replies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPatch {
    #[serde(default)]
    pub content: Option<String>,
}

impl ContentPatch {
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.content().is_none()
    }
}

/// Blog query; every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogFilter {
    pub blog_id: Option<EntityId>,
    pub title: Option<String>,
    pub author_id: Option<EntityId>,
    pub created_at: Option<DateTime<Utc>>,
    /// Matches when the blog carries any of these tags.
    pub tags: BTreeSet<String>,
}

impl BlogFilter {
    pub fn matches(&self, blog: &Blog) -> bool {
        if let Some(id) = &self.blog_id {
            if blog.blog_id != *id {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if blog.title != *title {
                return false;
            }
        }
        if let Some(author) = &self.author_id {
            if blog.author_id != *author {
                return false;
            }
        }
        if let Some(created_at) = &self.created_at {
            if blog.created_at != *created_at {
                return false;
            }
        }
        self.tags.is_empty() || !self.tags.is_disjoint(&blog.tags)
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Missing or non-positive values fall back to the defaults; sizes above
    /// `MAX_PAGE_SIZE` are capped to it.
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p > 0 => p.min(u32::MAX as i64) as u32,
            _ => DEFAULT_PAGE,
        };
        let size = match size {
            Some(s) if s > 0 => s.min(crate::validation::MAX_PAGE_SIZE as i64) as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, size }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.size as usize)
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }

    /// Applies the page to an already-ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_with_tags(tags: &[&str]) -> Blog {
        Blog {
            blog_id: EntityId::new(),
            author_id: EntityId::new(),
            title: "Title".into(),
            content: "Body".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
            interactions: Interactions::default(),
            comment_count: 0,
        }
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::new(None, None), Pagination::default());
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination::default());
        assert_eq!(Pagination::new(Some(-3), Some(-1)), Pagination::default());
        let p = Pagination::new(Some(3), Some(10));
        assert_eq!((p.page, p.size, p.offset()), (3, 10, 20));
    }

    #[test]
    fn test_pagination_size_capped() {
        let max = crate::validation::MAX_PAGE_SIZE;
        let p = Pagination::new(Some(1), Some(max as i64 + 1));
        assert_eq!(p.size, max);
        let p = Pagination::new(Some(1), Some(i64::MAX));
        assert_eq!(p.limit(), max as usize);
        assert_eq!(Pagination::new(Some(1), Some(max as i64)).size, max);
    }

    #[test]
    fn test_pagination_slice() {
        let p = Pagination::new(Some(2), Some(2));
        assert_eq!(p.slice(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        let beyond = Pagination::new(Some(9), Some(2));
        assert!(beyond.slice(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn test_filter_tags_any() {
        let blog = blog_with_tags(&["go", "systems"]);
        let mut filter = BlogFilter::default();
        assert!(filter.matches(&blog));

        filter.tags = ["rust", "go"].iter().map(|t| t.to_string()).collect();
        assert!(filter.matches(&blog));

        filter.tags = ["rust"].iter().map(|t| t.to_string()).collect();
        assert!(!filter.matches(&blog));
    }

    #[test]
    fn test_filter_fields_are_anded() {
        let blog = blog_with_tags(&["go"]);
        let filter = BlogFilter {
            title: Some("Title".into()),
            author_id: Some(EntityId::new()),
            ..Default::default()
        };
        assert!(!filter.matches(&blog));

        let filter = BlogFilter {
            title: Some("Title".into()),
            author_id: Some(blog.author_id),
            created_at: Some(blog.created_at),
            ..Default::default()
        };
        assert!(filter.matches(&blog));
    }

    #[test]
    fn test_patch_emptiness() {
        assert!(BlogPatch::default().is_empty());
        let patch = BlogPatch {
            title: Some("  ".into()),
            tags: Some(vec!["".into()]),
            ..Default::default()
        };
        assert!(patch.is_empty());
        let patch = BlogPatch {
            content: Some("new".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
