//! Error types for the tweet ledger

use crate::types::TweetId;
use std::fmt;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a caller was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// Caller did not create the targeted tweet
    NotAuthor,
    /// Caller is not the ledger owner
    NotOwner,
}

impl UnauthorizedReason {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            UnauthorizedReason::NotAuthor => "not_author",
            UnauthorizedReason::NotOwner => "not_owner",
        }
    }
}

impl fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnauthorizedReason::NotAuthor => write!(f, "You are not the author of this tweet"),
            UnauthorizedReason::NotOwner => write!(f, "caller is not the owner"),
        }
    }
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller identity does not match the required principal
    #[error("{0}")]
    Unauthorized(UnauthorizedReason),

    /// Target tweet has already been deleted
    #[error("The tweet is deleted")]
    AlreadyDeleted(TweetId),

    /// Tweet id outside the ledger's range
    #[error("Tweet not found: {0}")]
    NotFound(TweetId),

    /// Deposit amount rejected
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Invariant violation (broken audit chain, replay mismatch, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration or encoding error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for precondition failures raised by the ledger rules,
    /// false for infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized(_)
                | Error::AlreadyDeleted(_)
                | Error::NotFound(_)
                | Error::InvalidAmount(_)
        )
    }

    /// Metrics label for rejections
    pub fn rejection_label(&self) -> &'static str {
        match self {
            Error::Unauthorized(reason) => reason.label(),
            Error::AlreadyDeleted(_) => "already_deleted",
            Error::NotFound(_) => "not_found",
            Error::InvalidAmount(_) => "invalid_amount",
            _ => "internal",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
