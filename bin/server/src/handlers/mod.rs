//! HTTP handlers and the JSON shapes they answer with.

pub mod ai;
pub mod blogs;
pub mod comments;
pub mod replies;
pub mod users;

use axum::Json;
use blogmate::content::{Blog, Comment, Pagination, Reply};
use blogmate::{EntityId, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `?pageNumber=&pageSize=`; unparsable values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "pageNumber")]
    pub page_number: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

impl PageQuery {
    fn parse(value: &Option<String>) -> Option<i64> {
        value.as_deref().and_then(|v| v.trim().parse().ok())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(Self::parse(&self.page_number), Self::parse(&self.page_size))
    }

    /// `None` when neither parameter was supplied.
    pub fn explicit(&self) -> Option<Pagination> {
        if self.page_number.is_none() && self.page_size.is_none() {
            None
        } else {
            Some(self.pagination())
        }
    }
}

/// Plain `{"message": ...}` body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

pub fn parse_id(raw: &str) -> Result<EntityId> {
    EntityId::parse(raw)
}

#[derive(Debug, Serialize)]
pub struct BlogView {
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub likes: BTreeSet<EntityId>,
    pub dislikes: BTreeSet<EntityId>,
    pub viewers: BTreeSet<EntityId>,
    pub comment_count: u64,
}

impl From<Blog> for BlogView {
    fn from(blog: Blog) -> Self {
        Self {
            blog_id: blog.blog_id,
            author_id: blog.author_id,
            title: blog.title,
            content: blog.content,
            tags: blog.tags,
            created_at: blog.created_at,
            likes: blog.interactions.likes,
            dislikes: blog.interactions.dislikes,
            viewers: blog.interactions.viewers,
            comment_count: blog.comment_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub comment_id: EntityId,
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: BTreeSet<EntityId>,
    pub dislikes: BTreeSet<EntityId>,
    pub viewers: BTreeSet<EntityId>,
    pub reply_count: u64,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            comment_id: comment.comment_id,
            blog_id: comment.blog_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: comment.created_at,
            likes: comment.interactions.likes,
            dislikes: comment.interactions.dislikes,
            viewers: comment.interactions.viewers,
            reply_count: comment.reply_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyView {
    pub reply_id: EntityId,
    pub comment_id: EntityId,
    pub blog_id: EntityId,
    pub author_id: EntityId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: BTreeSet<EntityId>,
    pub dislikes: BTreeSet<EntityId>,
    pub viewers: BTreeSet<EntityId>,
}

impl From<Reply> for ReplyView {
    fn from(reply: Reply) -> Self {
        Self {
            reply_id: reply.reply_id,
            comment_id: reply.comment_id,
            blog_id: reply.blog_id,
            author_id: reply.author_id,
            content: reply.content,
            created_at: reply.created_at,
            likes: reply.interactions.likes,
            dislikes: reply.interactions.dislikes,
            viewers: reply.interactions.viewers,
        }
    }
}

/// Body for creating a comment or reply.
#[derive(Debug, Deserialize)]
pub struct NewText {
    pub content: String,
}

pub fn views<T, V: From<T>>(items: Vec<T>) -> Vec<V> {
    items.into_iter().map(V::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let absent = PageQuery::default();
        assert_eq!(absent.pagination(), Pagination::default());
        assert!(absent.explicit().is_none());

        let garbage = PageQuery {
            page_number: Some("abc".into()),
            page_size: Some("-3".into()),
        };
        assert_eq!(garbage.pagination(), Pagination::default());
        assert!(garbage.explicit().is_some());

        let given = PageQuery {
            page_number: Some("2".into()),
            page_size: Some("10".into()),
        };
        assert_eq!(given.pagination(), Pagination { page: 2, size: 10 });
    }
}
