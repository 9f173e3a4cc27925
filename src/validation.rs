//! Input validation and size limits for blog content and accounts.

use crate::error::{BlogError, Result};
use std::collections::BTreeSet;

/// Maximum blog title length in bytes.
pub const MAX_TITLE_LENGTH: usize = 512;

/// Maximum blog, comment or reply body length (100KB).
pub const MAX_CONTENT_LENGTH: usize = 100 * 1024;

/// Maximum number of tags on one blog.
pub const MAX_TAGS_COUNT: usize = 10;

/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 64;

/// Username length bounds.
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Maximum email length (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Password length bounds.
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Validation functions for input data
pub struct Validator;

impl Validator {
    /// Title must be non-blank and bounded.
    pub fn title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(BlogError::validation("title must not be empty"));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(BlogError::validation(format!(
                "title too long (max {} bytes)",
                MAX_TITLE_LENGTH
            )));
        }
        Ok(())
    }

    /// Body text of a blog, comment or reply.
    pub fn content(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(BlogError::validation("content must not be empty"));
        }
        if content.len() > MAX_CONTENT_LENGTH {
            return Err(BlogError::validation(format!(
                "content too long (max {} bytes)",
                MAX_CONTENT_LENGTH
            )));
        }
        Ok(())
    }

    /// Trims, drops blanks and dedups a tag list.
    pub fn tags<I, S>(tags: I) -> Result<BTreeSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() {
                continue;
            }
            if tag.len() > MAX_TAG_LENGTH {
                return Err(BlogError::validation(format!(
                    "tag too long (max {} bytes)",
                    MAX_TAG_LENGTH
                )));
            }
            set.insert(tag.to_string());
        }
        if set.len() > MAX_TAGS_COUNT {
            return Err(BlogError::validation(format!(
                "too many tags (max {})",
                MAX_TAGS_COUNT
            )));
        }
        Ok(set)
    }

    /// Letters, digits, `_`, `-` and `.` only.
    pub fn username(username: &str) -> Result<()> {
        let len = username.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
            return Err(BlogError::validation(format!(
                "username must be {}-{} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(BlogError::validation(
                "username may only contain letters, digits, '_', '-' and '.'",
            ));
        }
        Ok(())
    }

    /// Shape check only; delivery proves ownership.
    pub fn email(email: &str) -> Result<()> {
        if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
            return Err(BlogError::validation("invalid email address"));
        }
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(BlogError::validation("invalid email address")),
        }
    }

    pub fn password(password: &str) -> Result<()> {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(BlogError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(BlogError::validation("password too long"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_content() {
        assert!(Validator::title("Hello").is_ok());
        assert!(Validator::title("   ").is_err());
        assert!(Validator::title(&"t".repeat(MAX_TITLE_LENGTH + 1)).is_err());
        assert!(Validator::content("body").is_ok());
        assert!(Validator::content("").is_err());
    }

    #[test]
    fn test_tags_are_normalized() {
        let tags = Validator::tags(["go", " systems ", "go", "", "  "]).unwrap();
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["go".to_string(), "systems".to_string()]
        );
    }

    #[test]
    fn test_tag_limits() {
        let many: Vec<String> = (0..=MAX_TAGS_COUNT).map(|i| format!("t{}", i)).collect();
        assert!(Validator::tags(&many).is_err());
        assert!(Validator::tags([&"x".repeat(MAX_TAG_LENGTH + 1)]).is_err());
    }

    #[test]
    fn test_username() {
        assert!(Validator::username("alice_01").is_ok());
        assert!(Validator::username("al").is_err());
        assert!(Validator::username("bad name").is_err());
    }

    #[test]
    fn test_email() {
        assert!(Validator::email("a@example.com").is_ok());
        assert!(Validator::email("example.com").is_err());
        assert!(Validator::email("a@b").is_err());
        assert!(Validator::email("a@@b.com").is_err());
        assert!(Validator::email("a b@c.com").is_err());
    }

    #[test]
    fn test_password() {
        assert!(Validator::password("longenough").is_ok());
        assert!(Validator::password("short").is_err());
    }
}
