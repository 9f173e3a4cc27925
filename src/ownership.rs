//! Authorship and ownership checks.
//!
//! The caller identity always comes from the verified bearer token, never
//! from a request body, so create operations stamp `caller.user_id` as the
//! author and mutations compare against the stored author.

use crate::error::{BlogError, Result};
use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(BlogError::validation(format!("unknown role '{}'", other))),
        }
    }
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: EntityId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: EntityId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user(user_id: EntityId) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn admin(user_id: EntityId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owner-or-admin check for updates and deletes.
    pub fn authorize_mutation(&self, author_id: &EntityId) -> Result<()> {
        if self.user_id == *author_id || self.is_admin() {
            Ok(())
        } else {
            Err(BlogError::unauthorized("only the author or an admin may modify this"))
        }
    }

    /// Admin-only gate for role changes and account administration.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(BlogError::unauthorized("admin role required"))
        }
    }

    /// Account deletion: admins, or the account holder.
    pub fn authorize_account(&self, user_id: &EntityId) -> Result<()> {
        self.authorize_mutation(user_id)
    }

    /// Role change gate: admin only, and an admin cannot demote themselves.
    pub fn authorize_role_change(&self, target: &EntityId, new_role: Role) -> Result<()> {
        self.require_admin()?;
        if *target == self.user_id && !new_role.is_admin() {
            return Err(BlogError::SelfDemotion);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_may_mutate() {
        let author = EntityId::new();
        assert!(Caller::user(author).authorize_mutation(&author).is_ok());
        assert!(Caller::admin(EntityId::new())
            .authorize_mutation(&author)
            .is_ok());
    }

    #[test]
    fn test_stranger_is_unauthorized() {
        let author = EntityId::new();
        let result = Caller::user(EntityId::new()).authorize_mutation(&author);
        assert!(matches!(result, Err(BlogError::Unauthorized(_))));
    }

    #[test]
    fn test_role_change_rules() {
        let admin = Caller::admin(EntityId::new());
        let other = EntityId::new();

        assert!(admin.authorize_role_change(&other, Role::Admin).is_ok());
        assert!(admin.authorize_role_change(&other, Role::User).is_ok());
        assert!(matches!(
            admin.authorize_role_change(&admin.user_id, Role::User),
            Err(BlogError::SelfDemotion)
        ));
        // Promoting yourself while already admin is harmless.
        assert!(admin.authorize_role_change(&admin.user_id, Role::Admin).is_ok());

        let user = Caller::user(EntityId::new());
        assert!(matches!(
            user.authorize_role_change(&other, Role::Admin),
            Err(BlogError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }
}
