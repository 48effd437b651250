//! Tweet Ledger
//!
//! Authenticated record store of short text posts with owner-gated withdrawal.
//!
//! # Architecture
//!
//! - **State Machine**: Authorship and lifecycle rules live in one pure, synchronous type
//! - **Single Writer**: One actor task applies every mutation in a strict total order
//! - **Event Log**: Each committed mutation is a hash-chained event in RocksDB
//! - **Soft Delete**: Records are flagged, never removed, so ids stay stable
//!
//! # Invariants
//!
//! - A tweet's id equals its position in the append-only sequence
//! - Only a tweet's author may edit or delete it
//! - Deleted tweets are terminal and hidden from enumeration
//! - Only the owner may withdraw; ownership never changes
//! - A failed operation leaves no trace in state or log

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod types;
pub mod state;
pub mod storage;
pub mod ledger;
pub mod crypto;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result, UnauthorizedReason};
pub use types::{
    EventKind, LedgerEvent, LedgerSummary, Principal, Tweet, TweetId, TweetStatus, Withdrawal,
};
pub use state::{Command, TweetLedger};
pub use storage::Storage;
pub use ledger::Ledger;
pub use config::Config;
