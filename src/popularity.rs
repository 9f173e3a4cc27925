//! Popularity ordering for blogs.
//!
//! Blogs rank by likes (desc), viewers (desc), comment count (desc) and
//! dislikes (asc). Remaining ties go to the newer blog, then the smaller id,
//! so the order is total and repeatable. Nothing is cached; every call ranks
//! the blogs it is given.

use crate::content::types::Blog;
use std::cmp::{Ordering, Reverse};

/// Derived counts used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityKey {
    pub likes: usize,
    pub dislikes: usize,
    pub views: usize,
    pub comments: u64,
}

impl PopularityKey {
    pub fn of(blog: &Blog) -> Self {
        Self {
            likes: blog.interactions.like_count(),
            dislikes: blog.interactions.dislike_count(),
            views: blog.interactions.view_count(),
            comments: blog.comment_count,
        }
    }
}

/// Total order: most popular first.
pub fn compare(a: &Blog, b: &Blog) -> Ordering {
    let (ka, kb) = (PopularityKey::of(a), PopularityKey::of(b));
    (
        Reverse(ka.likes),
        Reverse(ka.views),
        Reverse(ka.comments),
        ka.dislikes,
        Reverse(a.created_at),
        a.blog_id,
    )
        .cmp(&(
            Reverse(kb.likes),
            Reverse(kb.views),
            Reverse(kb.comments),
            kb.dislikes,
            Reverse(b.created_at),
            b.blog_id,
        ))
}

/// Sorts blogs most popular first.
pub fn rank(mut blogs: Vec<Blog>) -> Vec<Blog> {
    blogs.sort_by(compare);
    blogs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;
    use crate::interaction::Interactions;
    use chrono::{Duration, Utc};
    use rand::seq::SliceRandom;

    fn blog(likes: usize, views: usize, comments: u64, dislikes: usize, age_secs: i64) -> Blog {
        let mut interactions = Interactions::default();
        for _ in 0..likes {
            let u = EntityId::new();
            interactions.likes.insert(u);
            interactions.viewers.insert(u);
        }
        for _ in 0..dislikes {
            let u = EntityId::new();
            interactions.dislikes.insert(u);
            interactions.viewers.insert(u);
        }
        while interactions.viewers.len() < views {
            interactions.viewers.insert(EntityId::new());
        }
        Blog {
            blog_id: EntityId::new(),
            author_id: EntityId::new(),
            title: "t".into(),
            content: "c".into(),
            tags: Default::default(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            interactions,
            comment_count: comments,
        }
    }

    #[test]
    fn test_likes_dominate() {
        let popular = blog(3, 3, 0, 0, 100);
        let viewed = blog(1, 50, 20, 0, 0);
        let ranked = rank(vec![viewed.clone(), popular.clone()]);
        assert_eq!(ranked[0].blog_id, popular.blog_id);
    }

    #[test]
    fn test_key_precedence() {
        let base = Utc::now();
        let mut a = blog(2, 5, 1, 0, 0);
        let mut b = blog(2, 4, 9, 0, 0);
        a.created_at = base;
        b.created_at = base;
        // Same likes: more viewers wins over more comments.
        assert_eq!(compare(&a, &b), Ordering::Less);

        let mut c = blog(2, 5, 3, 1, 0);
        let mut d = blog(2, 5, 3, 2, 0);
        c.created_at = base;
        d.created_at = base;
        // Everything else equal: fewer dislikes wins.
        assert_eq!(compare(&c, &d), Ordering::Less);
    }

    #[test]
    fn test_ties_prefer_newer_then_smaller_id() {
        let older = blog(0, 0, 0, 0, 60);
        let newer = blog(0, 0, 0, 0, 0);
        assert_eq!(compare(&newer, &older), Ordering::Less);

        let mut twin = newer.clone();
        twin.blog_id = EntityId::new();
        let expected = if newer.blog_id < twin.blog_id {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        assert_eq!(compare(&newer, &twin), expected);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let mut rng = rand::thread_rng();
        let blogs: Vec<Blog> = (0..30)
            .map(|i| blog(i % 4, (i % 7) + 4, (i % 3) as u64, i % 2, (i % 5) as i64))
            .collect();
        let expected = rank(blogs.clone());
        for _ in 0..10 {
            let mut shuffled = blogs.clone();
            shuffled.shuffle(&mut rng);
            let ids: Vec<_> = rank(shuffled).iter().map(|b| b.blog_id).collect();
            let want: Vec<_> = expected.iter().map(|b| b.blog_id).collect();
            assert_eq!(ids, want);
        }
    }
}
