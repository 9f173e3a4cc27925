//! # blogmate
//!
//! Backend for a blogging platform: blogs with nested comments and replies,
//! like/dislike/view tracking on every level, popularity ranking, user
//! accounts with email verification and roles, and AI-assisted authoring.
//!
//! ## Layout
//!
//! - [`content`]: blog/comment/reply records and the RocksDB content store
//! - [`interaction`]: the like/dislike/view transition table
//! - [`popularity`]: composite popularity ordering
//! - [`ownership`]: caller identity, roles and owner-or-admin checks
//! - [`users`]: account directory, password hashing, single-use tokens
//! - [`ai`]: prompt templates, topical guard and the Gemini adapter
//! - [`service`]: deadline-bounded async access to the blocking stores
//!
//! ## Example
//!
//! ```rust,no_run
//! use blogmate::content::{ContentStore, NewBlog};
//! use blogmate::interaction::Action;
//! use blogmate::ownership::Caller;
//! use blogmate::storage::{open_database, RocksDbConfig};
//! use blogmate::users::{NewAccount, UserDirectory};
//! use std::sync::Arc;
//! # fn main() -> blogmate::Result<()> {
//! let db = open_database("data", &RocksDbConfig::default())?;
//! let users = Arc::new(UserDirectory::new(db.clone()));
//! let store = ContentStore::new(db, users.clone());
//!
//! let reg = users.register(NewAccount {
//!     username: "alice".into(),
//!     email: "alice@example.com".into(),
//!     password: "correct horse".into(),
//! })?;
//! let alice = Caller::new(reg.user.user_id, reg.user.role);
//! let blog = store.create_blog(&alice, NewBlog {
//!     title: "Hello".into(),
//!     content: "First post".into(),
//!     tags: vec!["intro".into()],
//! })?;
//! let outcome = store.interact(
//!     blogmate::content::EntityRef::Blog { blog_id: blog.blog_id },
//!     &alice.user_id,
//!     Action::Like,
//! )?;
//! assert_eq!(outcome.message(), "added your like");
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod config;
pub mod content;
pub mod error;
pub mod id;
pub mod interaction;
pub mod ownership;
pub mod popularity;
pub mod service;
pub mod storage;
pub mod users;
pub mod validation;

pub use error::{BlogError, Result};
pub use id::EntityId;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
