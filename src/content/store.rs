//! RocksDB-backed storage for blogs, comments and replies.
//!
//! ## Storage Layout
//!
//! - `blogs`: `{blog_id}` -> Blog
//! - `comments`: `{comment_id}` -> Comment
//! - `replies`: `{reply_id}` -> Reply
//! - `idx_blogs`: `{inverted_ts}{blog_id}` -> () (newest first, id ascending on ties)
//! - `idx_comments`: `{blog_id}{ts}{comment_id}` -> () (oldest first per blog)
//! - `idx_replies`: `{comment_id}{ts}{reply_id}` -> () (oldest first per comment)
//!
//! Timestamps are milliseconds, and `created_at` is truncated to the same
//! precision so index order and record order always agree.
//!
//! ## Locking
//!
//! Record and index writes for one operation go out in a single batch while
//! the relevant entity locks are held:
//!
//! - interactions and updates lock only the target
//! - comment create locks the blog, reply create locks the comment
//! - deletes lock the target, its parent (for the counter) and every
//!   descendant, so a concurrent interaction cannot write a deleted record back

use crate::content::types::{
    Blog, BlogFilter, BlogPatch, Comment, ContentPatch, EntityRef, NewBlog, Pagination, Reply,
};
use crate::error::{BlogError, Result};
use crate::id::{EntityId, ID_LEN};
use crate::interaction::{Action, Interactions, Interactive, Outcome};
use crate::ownership::Caller;
use crate::popularity;
use crate::storage::rocksdb::{inverted_timestamp_key, timestamp_key};
use crate::storage::{concat_key, EntityLocks, RocksDbHandle, WriteOps};
use crate::validation::Validator;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Record column families.
pub const CF_BLOGS: &str = "blogs";
pub const CF_COMMENTS: &str = "comments";
pub const CF_REPLIES: &str = "replies";

/// Index column families.
pub const CF_IDX_BLOGS: &str = "idx_blogs";
pub const CF_IDX_COMMENTS: &str = "idx_comments";
pub const CF_IDX_REPLIES: &str = "idx_replies";

/// Every column family owned by the content store.
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_BLOGS,
    CF_COMMENTS,
    CF_REPLIES,
    CF_IDX_BLOGS,
    CF_IDX_COMMENTS,
    CF_IDX_REPLIES,
];

/// Resolves whether a user id belongs to an existing account.
pub trait UserResolver: Send + Sync {
    fn user_exists(&self, user_id: &EntityId) -> Result<bool>;
}

// =============================================================================
// Index keys
// =============================================================================

fn blog_index_key(created_at: &DateTime<Utc>, blog_id: &EntityId) -> Vec<u8> {
    concat_key(&[
        &inverted_timestamp_key(created_at.timestamp_millis()),
        blog_id.as_bytes(),
    ])
}

fn child_index_key(parent: &EntityId, created_at: &DateTime<Utc>, child: &EntityId) -> Vec<u8> {
    concat_key(&[
        parent.as_bytes(),
        &timestamp_key(created_at.timestamp_millis()),
        child.as_bytes(),
    ])
}

/// The trailing id of any index key.
fn id_from_index_key(key: &[u8]) -> Option<EntityId> {
    key.len()
        .checked_sub(ID_LEN)
        .and_then(|start| EntityId::from_slice(&key[start..]))
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

// =============================================================================
// Store
// =============================================================================

/// Persistent blog/comment/reply store.
pub struct ContentStore {
    db: Arc<RocksDbHandle>,
    locks: EntityLocks,
    users: Arc<dyn UserResolver>,
}

impl ContentStore {
    pub fn new(db: Arc<RocksDbHandle>, users: Arc<dyn UserResolver>) -> Self {
        Self {
            db,
            locks: EntityLocks::new(),
            users,
        }
    }

    fn load<T: DeserializeOwned>(&self, cf: &str, id: &EntityId, what: &str) -> Result<T> {
        self.db
            .get(cf, id.as_bytes())?
            .ok_or_else(|| BlogError::not_found(what))
    }

    fn require_author(&self, caller: &Caller) -> Result<()> {
        if self.users.user_exists(&caller.user_id)? {
            Ok(())
        } else {
            Err(BlogError::InvalidAuthor(caller.user_id.to_hex()))
        }
    }

    /// (index key, child id) for every child of `parent` in an index family.
    fn children(&self, cf: &str, parent: &EntityId) -> Result<Vec<(Vec<u8>, EntityId)>> {
        let mut children = Vec::new();
        self.db.prefix_iterate(cf, parent.as_bytes(), |key, _| {
            match id_from_index_key(key) {
                Some(id) => children.push((key.to_vec(), id)),
                None => warn!(cf = cf, "Malformed index key skipped"),
            }
            Ok(true)
        })?;
        Ok(children)
    }

    /// Loads one page of children in index order.
    fn child_page<T: DeserializeOwned>(
        &self,
        index_cf: &str,
        record_cf: &str,
        parent: &EntityId,
        page: Pagination,
    ) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(page.limit());
        let mut skipped = 0;
        self.db.prefix_iterate(index_cf, parent.as_bytes(), |key, _| {
            if skipped < page.offset() {
                skipped += 1;
                return Ok(true);
            }
            if let Some(id) = id_from_index_key(key) {
                if let Some(item) = self.db.get(record_cf, id.as_bytes())? {
                    items.push(item);
                }
            }
            Ok(items.len() < page.limit())
        })?;
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Blogs
    // -------------------------------------------------------------------------

    /// Creates a blog authored by the caller.
    pub fn create_blog(&self, caller: &Caller, new: NewBlog) -> Result<Blog> {
        Validator::title(&new.title)?;
        Validator::content(&new.content)?;
        let tags = Validator::tags(&new.tags)?;
        self.require_author(caller)?;

        let blog = Blog {
            blog_id: EntityId::new(),
            author_id: caller.user_id,
            title: new.title,
            content: new.content,
            tags,
            created_at: now(),
            interactions: Interactions::default(),
            comment_count: 0,
        };

        let mut ops = WriteOps::new();
        ops.put(CF_BLOGS, blog.blog_id.as_bytes(), &blog)?;
        ops.put_raw(
            CF_IDX_BLOGS,
            &blog_index_key(&blog.created_at, &blog.blog_id),
            &[],
        );
        self.db.commit(ops)?;

        info!(
            blog = %blog.blog_id,
            author = %blog.author_id,
            tags = blog.tags.len(),
            "Blog created"
        );
        Ok(blog)
    }

    pub fn get_blog(&self, blog_id: &EntityId) -> Result<Blog> {
        self.load(CF_BLOGS, blog_id, "Blog")
    }

    /// Filtered listing, newest first.
    pub fn query_blogs(&self, filter: &BlogFilter, page: Pagination) -> Result<Vec<Blog>> {
        if let Some(blog_id) = &filter.blog_id {
            let found: Option<Blog> = self.db.get(CF_BLOGS, blog_id.as_bytes())?;
            let matched = found.filter(|blog| filter.matches(blog));
            return Ok(page.slice(matched.into_iter().collect()));
        }

        let mut items = Vec::with_capacity(page.limit());
        let mut matched = 0;
        self.db.prefix_iterate(CF_IDX_BLOGS, &[], |key, _| {
            let Some(id) = id_from_index_key(key) else {
                return Ok(true);
            };
            let Some(blog) = self.db.get::<Blog>(CF_BLOGS, id.as_bytes())? else {
                warn!(blog = %id, "Index entry without record");
                return Ok(true);
            };
            if !filter.matches(&blog) {
                return Ok(true);
            }
            matched += 1;
            if matched > page.offset() {
                items.push(blog);
            }
            Ok(items.len() < page.limit())
        })?;

        debug!(
            page = page.page,
            size = page.size,
            returned = items.len(),
            "Blog query completed"
        );
        Ok(items)
    }

    pub fn list_blogs(&self, page: Pagination) -> Result<Vec<Blog>> {
        self.query_blogs(&BlogFilter::default(), page)
    }

    /// All blogs in popularity order, optionally paged.
    pub fn popular_blogs(&self, page: Option<Pagination>) -> Result<Vec<Blog>> {
        let blogs: Vec<Blog> = self.db.collect_all(CF_BLOGS)?;
        let ranked = popularity::rank(blogs);
        Ok(match page {
            Some(page) => page.slice(ranked),
            None => ranked,
        })
    }

    /// Applies the non-empty fields of `patch`.
    pub fn update_blog(&self, caller: &Caller, blog_id: &EntityId, patch: BlogPatch) -> Result<Blog> {
        let _guard = self.locks.lock(blog_id);
        let mut blog: Blog = self.load(CF_BLOGS, blog_id, "Blog")?;
        caller.authorize_mutation(&blog.author_id)?;

        if patch.is_empty() {
            return Ok(blog);
        }
        if let Some(title) = patch.title() {
            Validator::title(title)?;
            blog.title = title.to_string();
        }
        if let Some(content) = patch.content() {
            Validator::content(content)?;
            blog.content = content.to_string();
        }
        if let Some(tags) = patch.tags() {
            blog.tags = Validator::tags(tags)?;
        }

        self.db.put(CF_BLOGS, blog_id.as_bytes(), &blog)?;
        info!(blog = %blog_id, editor = %caller.user_id, "Blog updated");
        Ok(blog)
    }

    /// Deletes a blog with all of its comments and their replies.
    pub fn delete_blog(&self, caller: &Caller, blog_id: &EntityId) -> Result<()> {
        loop {
            let comments = self.children(CF_IDX_COMMENTS, blog_id)?;
            let mut replies = Vec::new();
            for (_, comment_id) in &comments {
                replies.extend(self.children(CF_IDX_REPLIES, comment_id)?);
            }

            let guard = self.locks.lock_all(
                std::iter::once(blog_id)
                    .chain(comments.iter().map(|(_, id)| id))
                    .chain(replies.iter().map(|(_, id)| id)),
            );

            let blog: Blog = self.load(CF_BLOGS, blog_id, "Blog")?;
            caller.authorize_mutation(&blog.author_id)?;

            // Children created between enumeration and locking force a retry.
            let comments = self.children(CF_IDX_COMMENTS, blog_id)?;
            let mut replies = Vec::new();
            for (_, comment_id) in &comments {
                replies.extend(self.children(CF_IDX_REPLIES, comment_id)?);
            }
            let all_covered = comments
                .iter()
                .chain(replies.iter())
                .all(|(_, id)| self.locks.covers(&guard, id));
            if !all_covered {
                debug!(blog = %blog_id, "Cascade set changed while locking, retrying");
                continue;
            }

            let mut ops = WriteOps::new();
            for (index_key, reply_id) in &replies {
                ops.delete(CF_IDX_REPLIES, index_key);
                ops.delete(CF_REPLIES, reply_id.as_bytes());
            }
            for (index_key, comment_id) in &comments {
                ops.delete(CF_IDX_COMMENTS, index_key);
                ops.delete(CF_COMMENTS, comment_id.as_bytes());
            }
            ops.delete(CF_IDX_BLOGS, &blog_index_key(&blog.created_at, blog_id));
            ops.delete(CF_BLOGS, blog_id.as_bytes());
            self.db.commit(ops)?;

            info!(
                blog = %blog_id,
                actor = %caller.user_id,
                comments = comments.len(),
                replies = replies.len(),
                "Blog deleted"
            );
            return Ok(());
        }
    }

    // -------------------------------------------------------------------------
    // Comments
    // -------------------------------------------------------------------------

    fn scoped_comment(&self, blog_id: &EntityId, comment_id: &EntityId) -> Result<Comment> {
        let comment: Comment = self.load(CF_COMMENTS, comment_id, "Comment")?;
        if comment.blog_id != *blog_id {
            return Err(BlogError::scope(format!(
                "comment {} does not belong to blog {}",
                comment_id, blog_id
            )));
        }
        Ok(comment)
    }

    /// Adds a comment and bumps the blog's comment count.
    pub fn create_comment(&self, caller: &Caller, blog_id: &EntityId, content: &str) -> Result<Comment> {
        Validator::content(content)?;
        self.require_author(caller)?;

        let _guard = self.locks.lock(blog_id);
        let mut blog: Blog = self.load(CF_BLOGS, blog_id, "Blog")?;

        let comment = Comment {
            comment_id: EntityId::new(),
            blog_id: *blog_id,
            author_id: caller.user_id,
            content: content.to_string(),
            created_at: now(),
            interactions: Interactions::default(),
            reply_count: 0,
        };
        blog.comment_count += 1;

        let mut ops = WriteOps::new();
        ops.put(CF_COMMENTS, comment.comment_id.as_bytes(), &comment)?;
        ops.put_raw(
            CF_IDX_COMMENTS,
            &child_index_key(blog_id, &comment.created_at, &comment.comment_id),
            &[],
        );
        ops.put(CF_BLOGS, blog_id.as_bytes(), &blog)?;
        self.db.commit(ops)?;

        info!(blog = %blog_id, comment = %comment.comment_id, "Comment created");
        Ok(comment)
    }

    pub fn get_comment(&self, blog_id: &EntityId, comment_id: &EntityId) -> Result<Comment> {
        self.scoped_comment(blog_id, comment_id)
    }

    /// Comments of a blog, oldest first.
    pub fn list_comments(&self, blog_id: &EntityId, page: Pagination) -> Result<Vec<Comment>> {
        if !self.db.exists(CF_BLOGS, blog_id.as_bytes())? {
            return Err(BlogError::not_found("Blog"));
        }
        self.child_page(CF_IDX_COMMENTS, CF_COMMENTS, blog_id, page)
    }

    pub fn update_comment(
        &self,
        caller: &Caller,
        blog_id: &EntityId,
        comment_id: &EntityId,
        patch: ContentPatch,
    ) -> Result<Comment> {
        let _guard = self.locks.lock(comment_id);
        let mut comment = self.scoped_comment(blog_id, comment_id)?;
        caller.authorize_mutation(&comment.author_id)?;

        if let Some(content) = patch.content() {
            Validator::content(content)?;
            comment.content = content.to_string();
            self.db.put(CF_COMMENTS, comment_id.as_bytes(), &comment)?;
            info!(comment = %comment_id, editor = %caller.user_id, "Comment updated");
        }
        Ok(comment)
    }

    /// Deletes a comment with its replies and decrements the blog's count.
    pub fn delete_comment(&self, caller: &Caller, blog_id: &EntityId, comment_id: &EntityId) -> Result<()> {
        loop {
            let replies = self.children(CF_IDX_REPLIES, comment_id)?;
            let guard = self.locks.lock_all(
                [blog_id, comment_id]
                    .into_iter()
                    .chain(replies.iter().map(|(_, id)| id)),
            );

            let comment = self.scoped_comment(blog_id, comment_id)?;
            caller.authorize_mutation(&comment.author_id)?;

            let replies = self.children(CF_IDX_REPLIES, comment_id)?;
            if !replies.iter().all(|(_, id)| self.locks.covers(&guard, id)) {
                continue;
            }

            let mut ops = WriteOps::new();
            for (index_key, reply_id) in &replies {
                ops.delete(CF_IDX_REPLIES, index_key);
                ops.delete(CF_REPLIES, reply_id.as_bytes());
            }
            ops.delete(
                CF_IDX_COMMENTS,
                &child_index_key(blog_id, &comment.created_at, comment_id),
            );
            ops.delete(CF_COMMENTS, comment_id.as_bytes());

            if let Some(mut blog) = self.db.get::<Blog>(CF_BLOGS, blog_id.as_bytes())? {
                blog.comment_count = blog.comment_count.saturating_sub(1);
                ops.put(CF_BLOGS, blog_id.as_bytes(), &blog)?;
            }
            self.db.commit(ops)?;

            info!(
                blog = %blog_id,
                comment = %comment_id,
                replies = replies.len(),
                "Comment deleted"
            );
            return Ok(());
        }
    }

    // -------------------------------------------------------------------------
    // Replies
    // -------------------------------------------------------------------------

    fn scoped_reply(
        &self,
        blog_id: &EntityId,
        comment_id: &EntityId,
        reply_id: &EntityId,
    ) -> Result<Reply> {
        let reply: Reply = self.load(CF_REPLIES, reply_id, "Reply")?;
        if reply.comment_id != *comment_id || reply.blog_id != *blog_id {
            return Err(BlogError::scope(format!(
                "reply {} does not belong to comment {} of blog {}",
                reply_id, comment_id, blog_id
            )));
        }
        Ok(reply)
    }

    /// Adds a reply and bumps the comment's reply count.
    pub fn create_reply(
        &self,
        caller: &Caller,
        blog_id: &EntityId,
        comment_id: &EntityId,
        content: &str,
    ) -> Result<Reply> {
        Validator::content(content)?;
        self.require_author(caller)?;

        let _guard = self.locks.lock(comment_id);
        let mut comment = self.scoped_comment(blog_id, comment_id)?;

        let reply = Reply {
            reply_id: EntityId::new(),
            comment_id: *comment_id,
            blog_id: *blog_id,
            author_id: caller.user_id,
            content: content.to_string(),
            created_at: now(),
            interactions: Interactions::default(),
        };
        comment.reply_count += 1;

        let mut ops = WriteOps::new();
        ops.put(CF_REPLIES, reply.reply_id.as_bytes(), &reply)?;
        ops.put_raw(
            CF_IDX_REPLIES,
            &child_index_key(comment_id, &reply.created_at, &reply.reply_id),
            &[],
        );
        ops.put(CF_COMMENTS, comment_id.as_bytes(), &comment)?;
        self.db.commit(ops)?;

        info!(comment = %comment_id, reply = %reply.reply_id, "Reply created");
        Ok(reply)
    }

    pub fn get_reply(
        &self,
        blog_id: &EntityId,
        comment_id: &EntityId,
        reply_id: &EntityId,
    ) -> Result<Reply> {
        self.scoped_reply(blog_id, comment_id, reply_id)
    }

    /// Replies of a comment, oldest first.
    pub fn list_replies(
        &self,
        blog_id: &EntityId,
        comment_id: &EntityId,
        page: Pagination,
    ) -> Result<Vec<Reply>> {
        self.scoped_comment(blog_id, comment_id)?;
        self.child_page(CF_IDX_REPLIES, CF_REPLIES, comment_id, page)
    }

    pub fn update_reply(
        &self,
        caller: &Caller,
        blog_id: &EntityId,
        comment_id: &EntityId,
        reply_id: &EntityId,
        patch: ContentPatch,
    ) -> Result<Reply> {
        let _guard = self.locks.lock(reply_id);
        let mut reply = self.scoped_reply(blog_id, comment_id, reply_id)?;
        caller.authorize_mutation(&reply.author_id)?;

        if let Some(content) = patch.content() {
            Validator::content(content)?;
            reply.content = content.to_string();
            self.db.put(CF_REPLIES, reply_id.as_bytes(), &reply)?;
            info!(reply = %reply_id, editor = %caller.user_id, "Reply updated");
        }
        Ok(reply)
    }

    /// Deletes a reply and decrements the comment's count.
    pub fn delete_reply(
        &self,
        caller: &Caller,
        blog_id: &EntityId,
        comment_id: &EntityId,
        reply_id: &EntityId,
    ) -> Result<()> {
        let _guard = self.locks.lock_all([comment_id, reply_id]);
        let reply = self.scoped_reply(blog_id, comment_id, reply_id)?;
        caller.authorize_mutation(&reply.author_id)?;

        let mut ops = WriteOps::new();
        ops.delete(
            CF_IDX_REPLIES,
            &child_index_key(comment_id, &reply.created_at, reply_id),
        );
        ops.delete(CF_REPLIES, reply_id.as_bytes());
        if let Some(mut comment) = self.db.get::<Comment>(CF_COMMENTS, comment_id.as_bytes())? {
            comment.reply_count = comment.reply_count.saturating_sub(1);
            ops.put(CF_COMMENTS, comment_id.as_bytes(), &comment)?;
        }
        self.db.commit(ops)?;

        info!(comment = %comment_id, reply = %reply_id, "Reply deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Interactions
    // -------------------------------------------------------------------------

    /// Applies a like/dislike/view transition to any entity.
    pub fn interact(&self, target: EntityRef, user_id: &EntityId, action: Action) -> Result<Outcome> {
        if !self.users.user_exists(user_id)? {
            return Err(BlogError::InvalidUser(user_id.to_hex()));
        }

        let outcome = match target {
            EntityRef::Blog { blog_id } => {
                self.transition(CF_BLOGS, &blog_id, user_id, action, |id| {
                    self.load::<Blog>(CF_BLOGS, id, "Blog")
                })?
            }
            EntityRef::Comment {
                blog_id,
                comment_id,
            } => self.transition(CF_COMMENTS, &comment_id, user_id, action, |_| {
                self.scoped_comment(&blog_id, &comment_id)
            })?,
            EntityRef::Reply {
                blog_id,
                comment_id,
                reply_id,
            } => self.transition(CF_REPLIES, &reply_id, user_id, action, |_| {
                self.scoped_reply(&blog_id, &comment_id, &reply_id)
            })?,
        };

        debug!(
            kind = target.kind(),
            target = %target.target(),
            user = %user_id,
            action = %action,
            outcome = outcome.message(),
            "Interaction applied"
        );
        Ok(outcome)
    }

    /// One locked read-modify-write of an entity's interaction sets.
    fn transition<T, F>(
        &self,
        cf: &'static str,
        id: &EntityId,
        user_id: &EntityId,
        action: Action,
        load: F,
    ) -> Result<Outcome>
    where
        T: Interactive + Serialize,
        F: FnOnce(&EntityId) -> Result<T>,
    {
        let _guard = self.locks.lock(id);
        let mut entity = load(id)?;
        let outcome = entity.interactions_mut().apply(*user_id, action);
        if outcome.changed_state() {
            self.db.put(cf, id.as_bytes(), &entity)?;
        }
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Integrity helpers
    // -------------------------------------------------------------------------

    /// Number of stored comments indexed under a blog.
    pub fn stored_comment_count(&self, blog_id: &EntityId) -> Result<usize> {
        Ok(self.children(CF_IDX_COMMENTS, blog_id)?.len())
    }

    /// Number of stored replies indexed under a comment.
    pub fn stored_reply_count(&self, comment_id: &EntityId) -> Result<usize> {
        Ok(self.children(CF_IDX_REPLIES, comment_id)?.len())
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("db", &self.db)
            .field("locks", &self.locks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{open_database, RocksDbConfig};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Resolver backed by an explicit allow list.
    #[derive(Default)]
    struct KnownUsers(Mutex<HashSet<EntityId>>);

    impl KnownUsers {
        fn add(&self) -> EntityId {
            let id = EntityId::new();
            self.0.lock().unwrap().insert(id);
            id
        }
    }

    impl UserResolver for KnownUsers {
        fn user_exists(&self, user_id: &EntityId) -> Result<bool> {
            Ok(self.0.lock().unwrap().contains(user_id))
        }
    }

    fn create_test_store() -> (ContentStore, Arc<KnownUsers>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = open_database(temp_dir.path(), &RocksDbConfig::default()).unwrap();
        let users = Arc::new(KnownUsers::default());
        let store = ContentStore::new(db, users.clone());
        (store, users, temp_dir)
    }

    fn new_blog(title: &str, tags: &[&str]) -> NewBlog {
        NewBlog {
            title: title.to_string(),
            content: format!("{} body", title),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_index_key_layout() {
        let parent = EntityId::new();
        let child = EntityId::new();
        let key = child_index_key(&parent, &now(), &child);
        assert_eq!(key.len(), ID_LEN + 8 + ID_LEN);
        assert!(key.starts_with(parent.as_bytes()));
        assert_eq!(id_from_index_key(&key), Some(child));
    }

    #[test]
    fn test_create_blog_initial_state() {
        let (store, users, _temp) = create_test_store();
        let author = Caller::user(users.add());

        let blog = store
            .create_blog(&author, new_blog("First", &["go", "go", " systems"]))
            .unwrap();
        assert_eq!(blog.author_id, author.user_id);
        assert_eq!(blog.comment_count, 0);
        assert_eq!(blog.interactions, Interactions::default());
        assert_eq!(blog.tags.len(), 2);
        assert_eq!(store.get_blog(&blog.blog_id).unwrap(), blog);
    }

    #[test]
    fn test_create_blog_rejects_unknown_author() {
        let (store, _users, _temp) = create_test_store();
        let result = store.create_blog(&Caller::user(EntityId::new()), new_blog("T", &[]));
        assert!(matches!(result, Err(BlogError::InvalidAuthor(_))));
    }

    #[test]
    fn test_create_blog_requires_title_and_content() {
        let (store, users, _temp) = create_test_store();
        let author = Caller::user(users.add());
        let mut blank = new_blog("T", &[]);
        blank.title = "  ".into();
        assert!(matches!(
            store.create_blog(&author, blank),
            Err(BlogError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let (store, users, _temp) = create_test_store();
        let author = Caller::user(users.add());
        let blog = store.create_blog(&author, new_blog("T", &["a"])).unwrap();

        let same = store
            .update_blog(&author, &blog.blog_id, BlogPatch::default())
            .unwrap();
        assert_eq!(same, blog);
    }

    #[test]
    fn test_delete_comment_adjusts_count() {
        let (store, users, _temp) = create_test_store();
        let author = Caller::user(users.add());
        let blog = store.create_blog(&author, new_blog("T", &[])).unwrap();

        let c1 = store.create_comment(&author, &blog.blog_id, "one").unwrap();
        store.create_comment(&author, &blog.blog_id, "two").unwrap();
        store.create_reply(&author, &blog.blog_id, &c1.comment_id, "r").unwrap();
        assert_eq!(store.get_blog(&blog.blog_id).unwrap().comment_count, 2);

        store
            .delete_comment(&author, &blog.blog_id, &c1.comment_id)
            .unwrap();
        let blog = store.get_blog(&blog.blog_id).unwrap();
        assert_eq!(blog.comment_count, 1);
        assert_eq!(store.stored_comment_count(&blog.blog_id).unwrap(), 1);
        assert_eq!(store.stored_reply_count(&c1.comment_id).unwrap(), 0);
    }
}
