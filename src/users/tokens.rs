//! Single-use account tokens for email verification and password reset.

use crate::id::EntityId;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Random bytes per token (hex-encoded to twice this length).
pub const TOKEN_BYTES: usize = 32;

/// What a token may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPurpose {
    Verification,
    PasswordReset,
}

impl TokenPurpose {
    pub const ALL: [TokenPurpose; 2] = [TokenPurpose::Verification, TokenPurpose::PasswordReset];

    /// One-byte tag used in the per-user token index.
    pub fn tag(&self) -> u8 {
        match self {
            TokenPurpose::Verification => b'v',
            TokenPurpose::PasswordReset => b'r',
        }
    }
}

/// Stored token state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: EntityId,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub verification_ttl: Duration,
    pub reset_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            verification_ttl: Duration::hours(24),
            reset_ttl: Duration::hours(1),
        }
    }
}

impl TokenPolicy {
    pub fn ttl(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::Verification => self.verification_ttl,
            TokenPurpose::PasswordReset => self.reset_ttl,
        }
    }
}

/// Generates an unguessable token string.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
