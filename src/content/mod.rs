//! Nested blog content: blogs own comments, comments own replies.

pub mod store;
pub mod types;

pub use store::{ContentStore, UserResolver};
pub use types::{
    Blog, BlogFilter, BlogPatch, Comment, ContentPatch, EntityRef, NewBlog, Pagination, Reply,
};
