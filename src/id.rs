//! Opaque entity identifiers.
//!
//! An `EntityId` is 12 bytes: a 4-byte big-endian unix timestamp, 5 random
//! bytes fixed for the lifetime of the process, and a 3-byte counter seeded
//! randomly at startup. It renders as 24 lowercase hex characters. The
//! embedded timestamp is never used for ordering; creation order comes from
//! the entity's `created_at` field.

use crate::error::{BlogError, Result};
use rand::{rngs::OsRng, Rng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Number of raw bytes in an id.
pub const ID_LEN: usize = 12;

/// Number of hex characters in the textual form.
pub const ID_HEX_LEN: usize = ID_LEN * 2;

const COUNTER_MASK: u32 = 0x00ff_ffff;

fn process_unique() -> &'static [u8; 5] {
    static UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    UNIQUE.get_or_init(|| {
        let mut bytes = [0u8; 5];
        OsRng.fill_bytes(&mut bytes);
        bytes
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::thread_rng().gen::<u32>() & COUNTER_MASK))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK
}

/// Globally unique identifier shared by users, blogs, comments, replies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId([u8; ID_LEN]);

impl EntityId {
    /// Mints a fresh id.
    pub fn new() -> Self {
        let mut bytes = [0u8; ID_LEN];
        let secs = chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..].copy_from_slice(&next_counter().to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parses the 24-character hex form.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != ID_HEX_LEN {
            return Err(BlogError::InvalidId(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| BlogError::InvalidId(s.to_string()))?;
        Self::from_slice(&bytes).ok_or_else(|| BlogError::InvalidId(s.to_string()))
    }

    /// Builds an id from raw storage bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ID_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Returns the raw id bytes, used as storage keys.
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Returns the hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for EntityId {
    type Err = BlogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.to_hex())
    }
}

// JSON carries the hex string; bincode carries the raw bytes.
impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl<'de> serde::de::Visitor<'de> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 24-character hex id or 12 raw bytes")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                EntityId::parse(v).map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                EntityId::from_slice(v).ok_or_else(|| E::invalid_length(v.len(), &self))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut arr = [0u8; ID_LEN];
                for (i, byte) in arr.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(EntityId(arr))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(IdVisitor)
        } else {
            deserializer.deserialize_bytes(IdVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<EntityId> = (0..10_000).map(|_| EntityId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_hex_form() {
        let id = EntityId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), ID_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(EntityId::parse(&hex).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "abc", "zzzzzzzzzzzzzzzzzzzzzzzz", "0123456789abcdef012345678"] {
            assert!(matches!(EntityId::parse(bad), Err(BlogError::InvalidId(_))));
        }
    }

    #[test]
    fn test_json_uses_hex_string() {
        let id = EntityId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_bincode_uses_raw_bytes() {
        let id = EntityId::new();
        let bytes = bincode::serialize(&id).unwrap();
        // 8-byte length prefix plus the raw id
        assert_eq!(bytes.len(), 8 + ID_LEN);
        let back: EntityId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, id);
    }
}
