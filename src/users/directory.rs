//! RocksDB-backed account directory.
//!
//! ## Storage Layout
//!
//! - `users`: `{user_id}` -> User
//! - `idx_usernames`: `{lowercase username}` -> user_id bytes
//! - `idx_emails`: `{lowercase email}` -> user_id bytes
//! - `tokens`: `{token}` -> TokenRecord
//! - `idx_user_tokens`: `{user_id}{purpose tag}{token}` -> empty
//!
//! Writes that touch the unique indexes or tokens run under one directory
//! lock, so two registrations can never both claim a username. Password
//! hashing happens before the lock is taken.
//!
//! A user holds at most one live token per purpose: issuing a new one
//! revokes the previous one.

use crate::content::UserResolver;
use crate::content::Pagination;
use crate::error::{BlogError, Result};
use crate::id::EntityId;
use crate::ownership::{Caller, Role};
use crate::storage::{concat_key, RocksDbHandle, WriteOps};
use crate::users::password::{hash_password, verify_password, Password};
use crate::users::tokens::{generate_token, TokenPolicy, TokenPurpose, TokenRecord};
use crate::users::types::{AccountStatus, NewAccount, Registration, User, UserLookup};
use crate::validation::Validator;
use chrono::{SubsecRound, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub const CF_USERS: &str = "users";
pub const CF_IDX_USERNAMES: &str = "idx_usernames";
pub const CF_IDX_EMAILS: &str = "idx_emails";
pub const CF_TOKENS: &str = "tokens";
pub const CF_IDX_USER_TOKENS: &str = "idx_user_tokens";

/// Every column family owned by the directory.
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_USERS,
    CF_IDX_USERNAMES,
    CF_IDX_EMAILS,
    CF_TOKENS,
    CF_IDX_USER_TOKENS,
];

fn index_key(value: &str) -> Vec<u8> {
    value.trim().to_lowercase().into_bytes()
}

fn token_index_prefix(user_id: &EntityId, purpose: TokenPurpose) -> Vec<u8> {
    concat_key(&[user_id.as_bytes(), &[purpose.tag()]])
}

fn token_index_key(user_id: &EntityId, purpose: TokenPurpose, token: &str) -> Vec<u8> {
    concat_key(&[user_id.as_bytes(), &[purpose.tag()], token.as_bytes()])
}

/// Account storage and lifecycle operations.
pub struct UserDirectory {
    db: Arc<RocksDbHandle>,
    write_lock: Mutex<()>,
    policy: TokenPolicy,
}

impl UserDirectory {
    pub fn new(db: Arc<RocksDbHandle>) -> Self {
        Self::with_policy(db, TokenPolicy::default())
    }

    pub fn with_policy(db: Arc<RocksDbHandle>, policy: TokenPolicy) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| {
            warn!("User directory lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lookup_index(&self, cf: &str, value: &str) -> Result<Option<User>> {
        let Some(raw) = self.db.get_raw(cf, &index_key(value))? else {
            return Ok(None);
        };
        let user_id = EntityId::from_slice(&raw)
            .ok_or_else(|| BlogError::storage(format!("Corrupt index entry in {}", cf)))?;
        self.db.get(CF_USERS, user_id.as_bytes())
    }

    pub fn get_user(&self, user_id: &EntityId) -> Result<User> {
        self.db
            .get(CF_USERS, user_id.as_bytes())?
            .ok_or_else(|| BlogError::not_found("User"))
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.lookup_index(CF_IDX_USERNAMES, username)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.lookup_index(CF_IDX_EMAILS, email)
    }

    fn find(&self, lookup: &UserLookup) -> Result<User> {
        let found = match lookup {
            UserLookup::Username(name) => self.find_by_username(name)?,
            UserLookup::Email(email) => self.find_by_email(email)?,
        };
        found.ok_or_else(|| BlogError::not_found("User"))
    }

    /// Accounts ordered by registration time.
    pub fn list_users(&self, page: Pagination) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.db.collect_all(CF_USERS)?;
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(page.slice(users))
    }

    fn is_empty(&self) -> Result<bool> {
        let mut empty = true;
        self.db.prefix_iterate(CF_USERS, &[], |_, _| {
            empty = false;
            Ok(false)
        })?;
        Ok(empty)
    }

    /// Queues deletion of every live token of `purpose` held by the user.
    fn queue_revoke(&self, ops: &mut WriteOps, user_id: &EntityId, purpose: TokenPurpose) -> Result<()> {
        let prefix = token_index_prefix(user_id, purpose);
        for token in self.db.prefix_keys(CF_IDX_USER_TOKENS, &prefix)? {
            ops.delete(CF_TOKENS, &token);
            ops.delete(CF_IDX_USER_TOKENS, &concat_key(&[&prefix, &token]));
        }
        Ok(())
    }

    /// Issues a fresh token, replacing any earlier one of the same purpose.
    /// Caller must hold the write lock.
    fn queue_token(&self, ops: &mut WriteOps, user_id: EntityId, purpose: TokenPurpose) -> Result<String> {
        self.queue_revoke(ops, &user_id, purpose)?;

        let token = generate_token();
        let record = TokenRecord {
            user_id,
            purpose,
            expires_at: Utc::now() + self.policy.ttl(purpose),
        };
        ops.put(CF_TOKENS, token.as_bytes(), &record)?;
        ops.put_raw(CF_IDX_USER_TOKENS, &token_index_key(&user_id, purpose, &token), &[]);
        Ok(token)
    }

    /// Redeems a token exactly once. Caller must hold the write lock.
    fn consume_token(&self, token: &str, purpose: TokenPurpose) -> Result<User> {
        let record: TokenRecord = self
            .db
            .get(CF_TOKENS, token.as_bytes())?
            .ok_or(BlogError::InvalidToken)?;
        if record.purpose != purpose {
            return Err(BlogError::InvalidToken);
        }

        let mut ops = WriteOps::new();
        ops.delete(CF_TOKENS, token.as_bytes());
        ops.delete(CF_IDX_USER_TOKENS, &token_index_key(&record.user_id, purpose, token));
        self.db.commit(ops)?;
        if record.is_expired(Utc::now()) {
            return Err(BlogError::TokenExpired);
        }

        self.db
            .get(CF_USERS, record.user_id.as_bytes())?
            .ok_or(BlogError::InvalidToken)
    }

    /// Deletes every expired token and returns how many were removed.
    pub fn purge_expired_tokens(&self) -> Result<usize> {
        let _guard = self.lock();
        let now = Utc::now();
        let mut ops = WriteOps::new();
        let mut purged = 0;

        self.db.prefix_iterate(CF_TOKENS, &[], |key, value| {
            match bincode::deserialize::<TokenRecord>(value) {
                Ok(record) if record.is_expired(now) => {
                    ops.delete(CF_TOKENS, key);
                    ops.delete(
                        CF_IDX_USER_TOKENS,
                        &concat_key(&[&token_index_prefix(&record.user_id, record.purpose), key]),
                    );
                    purged += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Dropping unreadable token record: {}", e);
                    ops.delete(CF_TOKENS, key);
                    purged += 1;
                }
            }
            Ok(true)
        })?;

        if !ops.is_empty() {
            self.db.commit(ops)?;
            info!(purged, "Expired tokens purged");
        }
        Ok(purged)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Creates a pending account and its verification token.
    ///
    /// The first account in an empty directory becomes an admin.
    pub fn register(&self, account: NewAccount) -> Result<Registration> {
        let username = account.username.trim().to_string();
        let email = account.email.trim().to_string();
        Validator::username(&username)?;
        Validator::email(&email)?;
        Validator::password(&account.password)?;
        let password_hash = hash_password(&Password::new(account.password))?;

        let _guard = self.lock();
        if self.db.exists(CF_IDX_USERNAMES, &index_key(&username))? {
            return Err(BlogError::duplicate("username"));
        }
        if self.db.exists(CF_IDX_EMAILS, &index_key(&email))? {
            return Err(BlogError::duplicate("email"));
        }
        let role = if self.is_empty()? {
            Role::Admin
        } else {
            Role::User
        };

        let user = User {
            user_id: EntityId::new(),
            username,
            email,
            password_hash,
            role,
            status: AccountStatus::Pending,
            created_at: Utc::now().trunc_subsecs(3),
        };

        let mut ops = WriteOps::new();
        ops.put(CF_USERS, user.user_id.as_bytes(), &user)?;
        ops.put_raw(CF_IDX_USERNAMES, &index_key(&user.username), user.user_id.as_bytes());
        ops.put_raw(CF_IDX_EMAILS, &index_key(&user.email), user.user_id.as_bytes());
        let verification_token = self.queue_token(&mut ops, user.user_id, TokenPurpose::Verification)?;
        self.db.commit(ops)?;

        info!(user = %user.user_id, username = %user.username, role = %user.role, "Account registered");
        Ok(Registration {
            user,
            verification_token,
        })
    }

    /// Redeems a verification token and activates the account.
    pub fn verify_account(&self, token: &str) -> Result<User> {
        let _guard = self.lock();
        let mut user = self.consume_token(token, TokenPurpose::Verification)?;
        user.status = AccountStatus::Active;
        self.db.put(CF_USERS, user.user_id.as_bytes(), &user)?;
        info!(user = %user.user_id, "Account verified");
        Ok(user)
    }

    /// Checks credentials; `identifier` is a username or an email.
    pub fn login(&self, identifier: &str, password: &str) -> Result<User> {
        let found = if identifier.contains('@') {
            self.find_by_email(identifier)?
        } else {
            self.find_by_username(identifier)?
        };
        let user = found.ok_or(BlogError::BadCredentials)?;

        if !verify_password(&Password::new(password), &user.password_hash)? {
            warn!(user = %user.user_id, "Failed login attempt");
            return Err(BlogError::BadCredentials);
        }
        if !user.verified() {
            return Err(BlogError::unauthorized("account email is not verified"));
        }
        Ok(user)
    }

    /// Issues a password reset token for the account with this email.
    pub fn forget_password(&self, email: &str) -> Result<(User, String)> {
        let user = self
            .find_by_email(email)?
            .ok_or_else(|| BlogError::not_found("User"))?;

        let _guard = self.lock();
        let mut ops = WriteOps::new();
        let token = self.queue_token(&mut ops, user.user_id, TokenPurpose::PasswordReset)?;
        self.db.commit(ops)?;

        info!(user = %user.user_id, "Password reset requested");
        Ok((user, token))
    }

    /// Redeems a reset token and sets a new password.
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        Validator::password(new_password)?;
        let password_hash = hash_password(&Password::new(new_password))?;

        let _guard = self.lock();
        let mut user = self.consume_token(token, TokenPurpose::PasswordReset)?;
        user.password_hash = password_hash;
        self.db.put(CF_USERS, user.user_id.as_bytes(), &user)?;

        info!(user = %user.user_id, "Password reset");
        Ok(user)
    }

    pub fn change_password(&self, user_id: &EntityId, old_password: &str, new_password: &str) -> Result<User> {
        let user = self.get_user(user_id)?;
        if !verify_password(&Password::new(old_password), &user.password_hash)? {
            return Err(BlogError::BadCredentials);
        }
        Validator::password(new_password)?;
        let password_hash = hash_password(&Password::new(new_password))?;

        let _guard = self.lock();
        let mut user = self.get_user(user_id)?;
        user.password_hash = password_hash;
        self.db.put(CF_USERS, user_id.as_bytes(), &user)?;

        info!(user = %user_id, "Password changed");
        Ok(user)
    }

    /// Moves a verified account to a new email. The account stays active.
    pub fn change_email(&self, user_id: &EntityId, new_email: &str) -> Result<User> {
        let new_email = new_email.trim();
        Validator::email(new_email)?;

        let _guard = self.lock();
        let mut user = self.get_user(user_id)?;
        if !user.verified() {
            return Err(BlogError::unauthorized("account email is not verified"));
        }
        if index_key(&user.email) == index_key(new_email) {
            user.email = new_email.to_string();
            self.db.put(CF_USERS, user_id.as_bytes(), &user)?;
            return Ok(user);
        }
        if self.db.exists(CF_IDX_EMAILS, &index_key(new_email))? {
            return Err(BlogError::duplicate("email"));
        }

        let mut ops = WriteOps::new();
        ops.delete(CF_IDX_EMAILS, &index_key(&user.email));
        ops.put_raw(CF_IDX_EMAILS, &index_key(new_email), user_id.as_bytes());
        user.email = new_email.to_string();
        ops.put(CF_USERS, user_id.as_bytes(), &user)?;
        self.db.commit(ops)?;

        info!(user = %user_id, "Email changed");
        Ok(user)
    }

    /// Promotes or demotes an account. Admin only.
    pub fn set_role(&self, caller: &Caller, target: &UserLookup, role: Role) -> Result<User> {
        caller.require_admin()?;

        let _guard = self.lock();
        let mut user = self.find(target)?;
        caller.authorize_role_change(&user.user_id, role)?;
        if user.role != role {
            user.role = role;
            self.db.put(CF_USERS, user.user_id.as_bytes(), &user)?;
        }

        info!(user = %user.user_id, role = %role, by = %caller.user_id, "Role changed");
        Ok(user)
    }

    /// Removes an account. Admins may remove anyone; users only themselves.
    pub fn delete_user(&self, caller: &Caller, user_id: &EntityId) -> Result<()> {
        caller.authorize_account(user_id)?;

        let _guard = self.lock();
        let user = self.get_user(user_id)?;
        let mut ops = WriteOps::new();
        ops.delete(CF_IDX_USERNAMES, &index_key(&user.username));
        ops.delete(CF_IDX_EMAILS, &index_key(&user.email));
        ops.delete(CF_USERS, user_id.as_bytes());
        for purpose in TokenPurpose::ALL {
            self.queue_revoke(&mut ops, user_id, purpose)?;
        }
        self.db.commit(ops)?;

        info!(user = %user_id, by = %caller.user_id, "Account deleted");
        Ok(())
    }
}

impl UserResolver for UserDirectory {
    fn user_exists(&self, user_id: &EntityId) -> Result<bool> {
        self.db.exists(CF_USERS, user_id.as_bytes())
    }
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("db", &self.db)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{open_database, RocksDbConfig};
    use tempfile::TempDir;

    fn create_test_directory() -> (UserDirectory, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = open_database(temp_dir.path(), &RocksDbConfig::default()).unwrap();
        (UserDirectory::new(db), temp_dir)
    }

    fn account(name: &str) -> NewAccount {
        NewAccount {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn test_first_account_is_admin() {
        let (dir, _temp) = create_test_directory();
        let first = dir.register(account("alice")).unwrap();
        let second = dir.register(account("bob")).unwrap();
        assert_eq!(first.user.role, Role::Admin);
        assert_eq!(second.user.role, Role::User);
        assert_eq!(first.user.status, AccountStatus::Pending);
    }

    #[test]
    fn test_index_is_case_insensitive() {
        let (dir, _temp) = create_test_directory();
        dir.register(account("alice")).unwrap();
        assert!(dir.find_by_username("ALICE").unwrap().is_some());
        assert!(dir.find_by_email("Alice@Example.com").unwrap().is_some());
    }

    #[test]
    fn test_user_resolver() {
        let (dir, _temp) = create_test_directory();
        let reg = dir.register(account("alice")).unwrap();
        assert!(dir.user_exists(&reg.user.user_id).unwrap());
        assert!(!dir.user_exists(&EntityId::new()).unwrap());
    }
}
