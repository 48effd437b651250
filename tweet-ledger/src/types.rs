//! Core types for the tweet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Value-equality identity checks
//! - Exact arithmetic (Decimal for balances)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque caller identity supplied by the execution environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create new principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a principal from an ed25519 public key (lowercase hex)
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self(hex::encode(public_key))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tweet identifier: position in the append-only sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TweetId(u64);

impl TweetId {
    /// Create from raw index
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw index
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Storage key (big-endian keeps RocksDB iteration in id order)
    pub fn to_key(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for TweetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TweetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TweetStatus {
    /// Visible and editable by its author
    Active,
    /// Soft-deleted (terminal)
    Deleted,
}

/// A single post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Sequence index, immutable
    pub id: TweetId,

    /// Creator, immutable
    pub author: Principal,

    /// Text payload
    pub content: String,

    /// Soft-delete flag, never reset once set
    pub is_deleted: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tweet {
    /// Current lifecycle state
    pub fn status(&self) -> TweetStatus {
        if self.is_deleted {
            TweetStatus::Deleted
        } else {
            TweetStatus::Active
        }
    }
}

/// Funds released to the owner by a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Recipient (always the ledger owner)
    pub to: Principal,

    /// Amount transferred; zero when the balance was empty
    pub amount: Decimal,
}

/// Point-in-time view of the ledger's scalar state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Ledger owner
    pub owner: Principal,

    /// Accumulated balance
    pub balance: Decimal,

    /// Tweet slots, deleted ones included
    pub tweet_count: u64,

    /// Non-deleted tweets
    pub active_tweets: u64,

    /// Committed events
    pub event_count: u64,
}

/// State transition recorded in the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A tweet was appended
    TweetCreated {
        /// Assigned id
        id: TweetId,
        /// Initial content
        content: String,
    },
    /// A tweet's content was replaced
    TweetEdited {
        /// Target id
        id: TweetId,
        /// New content
        content: String,
    },
    /// A tweet was soft-deleted
    TweetDeleted {
        /// Target id
        id: TweetId,
    },
    /// Value received by the ledger
    Deposited {
        /// Amount added to the balance
        amount: Decimal,
    },
    /// Balance released to the owner
    Withdrawn {
        /// Recipient
        to: Principal,
        /// Amount released
        amount: Decimal,
    },
}

impl EventKind {
    /// Tweet touched by this event, if any
    pub fn tweet_id(&self) -> Option<TweetId> {
        match self {
            EventKind::TweetCreated { id, .. }
            | EventKind::TweetEdited { id, .. }
            | EventKind::TweetDeleted { id } => Some(*id),
            EventKind::Deposited { .. } | EventKind::Withdrawn { .. } => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TweetCreated { .. } => "tweet_created",
            EventKind::TweetEdited { .. } => "tweet_edited",
            EventKind::TweetDeleted { .. } => "tweet_deleted",
            EventKind::Deposited { .. } => "deposited",
            EventKind::Withdrawn { .. } => "withdrawn",
        }
    }
}

/// Committed ledger event, hash-chained to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Zero-based, gapless position in the log
    pub sequence: u64,

    /// What happened
    pub kind: EventKind,

    /// Identity that triggered the event
    pub caller: Principal,

    /// Event timestamp (nanoseconds since Unix epoch)
    pub timestamp_nanos: i64,

    /// Hash of the previous event (zeroes for the first)
    pub previous_hash: [u8; 32],

    /// SHA-256 of the canonical encoding
    pub hash: [u8; 32],
}

impl LedgerEvent {
    /// Create canonical bytes for hashing (hash field zeroed)
    pub fn canonical_bytes(&self) -> crate::Result<Vec<u8>> {
        let mut unsealed = self.clone();
        unsealed.hash = [0u8; 32];
        Ok(bincode::serialize(&unsealed)?)
    }

    /// Event time
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_from_public_key() {
        let principal = Principal::from_public_key(&[0xab; 32]);
        assert_eq!(principal.as_str().len(), 64);
        assert!(principal.as_str().starts_with("abab"));
    }

    #[test]
    fn test_tweet_id_key_orders_numerically() {
        assert!(TweetId::new(2).to_key() < TweetId::new(256).to_key());
    }

    #[test]
    fn test_tweet_status() {
        let mut tweet = Tweet {
            id: TweetId::new(0),
            author: Principal::new("alice"),
            content: "Hello, world!".to_string(),
            is_deleted: false,
            created_at: Utc::now(),
        };
        assert_eq!(tweet.status(), TweetStatus::Active);

        tweet.is_deleted = true;
        assert_eq!(tweet.status(), TweetStatus::Deleted);
    }

    #[test]
    fn test_canonical_bytes_ignore_hash() {
        let mut event = LedgerEvent {
            sequence: 0,
            kind: EventKind::TweetDeleted { id: TweetId::new(1) },
            caller: Principal::new("alice"),
            timestamp_nanos: 0,
            previous_hash: [0u8; 32],
            hash: [0u8; 32],
        };
        let before = event.canonical_bytes().unwrap();
        event.hash = [7u8; 32];
        assert_eq!(before, event.canonical_bytes().unwrap());
    }
}
