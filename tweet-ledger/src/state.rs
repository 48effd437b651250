//! In-memory tweet ledger state machine
//!
//! Every mutation goes through two steps:
//!
//! 1. [`TweetLedger::plan`] checks the caller and the record lifecycle against
//!    the current state and produces a sealed [`LedgerEvent`]. Nothing changes.
//! 2. [`TweetLedger::apply`] mutates the state from an already-validated event.
//!
//! The actor persists the event together with its [`StateDelta`] between the
//! two steps, so a failed commit leaves the state untouched.
//!
//! # Per-tweet lifecycle
//!
//! ```text
//!   create ──► Active ──edit──► Active
//!                 │
//!                 └──delete──► Deleted (terminal)
//! ```

use crate::crypto::seal_event;
use crate::error::UnauthorizedReason;
use crate::types::{
    EventKind, LedgerEvent, LedgerSummary, Principal, Tweet, TweetId, Withdrawal,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A mutation requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a new tweet
    CreateTweet {
        /// Tweet text
        content: String,
    },
    /// Replace a tweet's content
    EditTweet {
        /// Target tweet
        id: TweetId,
        /// Replacement text
        content: String,
    },
    /// Soft-delete a tweet
    DeleteTweet {
        /// Target tweet
        id: TweetId,
    },
    /// Incoming value transfer
    Deposit {
        /// Amount received
        amount: Decimal,
    },
    /// Release the whole balance to the owner
    Withdraw,
}

/// Post-image of a single event: what storage persists alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDelta {
    /// Sequence of the event
    pub sequence: u64,
    /// Hash of the event, the new chain head
    pub head_hash: [u8; 32],
    /// Tweet record as it looks after the event
    pub tweet: Option<Tweet>,
    /// Balance after the event
    pub balance: Decimal,
}

/// Ordered tweet records plus owner and balance
#[derive(Debug, Clone)]
pub struct TweetLedger {
    owner: Principal,
    tweets: Vec<Tweet>,
    balance: Decimal,
    next_sequence: u64,
    head_hash: [u8; 32],
}

impl TweetLedger {
    /// Empty ledger owned by `owner`
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            tweets: Vec::new(),
            balance: Decimal::ZERO,
            next_sequence: 0,
            head_hash: [0u8; 32],
        }
    }

    /// Rebuild state by applying a committed event log in order
    pub fn replay(owner: Principal, events: impl IntoIterator<Item = LedgerEvent>) -> Result<Self> {
        let mut ledger = Self::new(owner);
        for event in events {
            ledger.apply(&event)?;
        }
        Ok(ledger)
    }

    /// Ledger owner
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// Accumulated balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Number of tweet slots, deleted ones included
    pub fn tweet_count(&self) -> u64 {
        self.tweets.len() as u64
    }

    /// Sequence the next event will carry
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Hash of the last applied event
    pub fn head_hash(&self) -> [u8; 32] {
        self.head_hash
    }

    /// Scalar state snapshot
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            owner: self.owner.clone(),
            balance: self.balance,
            tweet_count: self.tweet_count(),
            active_tweets: self.tweets.iter().filter(|tweet| !tweet.is_deleted).count() as u64,
            event_count: self.next_sequence,
        }
    }

    /// Any record by id, deleted or not
    pub fn get_tweet(&self, id: TweetId) -> Result<&Tweet> {
        usize::try_from(id.value())
            .ok()
            .and_then(|index| self.tweets.get(index))
            .ok_or(Error::NotFound(id))
    }

    /// Every record in id order, deleted ones included
    pub fn records(&self) -> &[Tweet] {
        &self.tweets
    }

    /// Snapshot of non-deleted tweets in id order
    pub fn get_tweets(&self) -> Vec<Tweet> {
        self.tweets
            .iter()
            .filter(|tweet| !tweet.is_deleted)
            .cloned()
            .collect()
    }

    /// Append a tweet authored by `caller`
    pub fn create_tweet(&mut self, caller: &Principal, content: impl Into<String>) -> Result<TweetId> {
        let id = TweetId::new(self.tweet_count());
        self.execute(caller, Command::CreateTweet { content: content.into() }, Utc::now())?;
        Ok(id)
    }

    /// Replace the content of one of the caller's tweets
    pub fn edit_tweet(
        &mut self,
        caller: &Principal,
        id: TweetId,
        content: impl Into<String>,
    ) -> Result<()> {
        self.execute(caller, Command::EditTweet { id, content: content.into() }, Utc::now())?;
        Ok(())
    }

    /// Soft-delete one of the caller's tweets
    pub fn delete_tweet(&mut self, caller: &Principal, id: TweetId) -> Result<()> {
        self.execute(caller, Command::DeleteTweet { id }, Utc::now())?;
        Ok(())
    }

    /// Record an incoming transfer from `from`
    pub fn deposit(&mut self, from: &Principal, amount: Decimal) -> Result<()> {
        self.execute(from, Command::Deposit { amount }, Utc::now())?;
        Ok(())
    }

    /// Release the entire balance to the owner
    pub fn withdraw(&mut self, caller: &Principal) -> Result<Withdrawal> {
        let event = self.execute(caller, Command::Withdraw, Utc::now())?;
        match event.kind {
            EventKind::Withdrawn { to, amount } => Ok(Withdrawal { to, amount }),
            other => Err(Error::InvariantViolation(format!(
                "Withdraw produced {} event",
                other.name()
            ))),
        }
    }

    /// Plan and apply in one step
    pub fn execute(
        &mut self,
        caller: &Principal,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let event = self.plan(caller, command, now)?;
        self.apply(&event)?;
        Ok(event)
    }

    /// Validate `command` for `caller` and build the event it would commit
    ///
    /// Edit and delete check, in order: the id exists, the caller is the
    /// author, the tweet is not deleted.
    pub fn plan(
        &self,
        caller: &Principal,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let kind = match command {
            Command::CreateTweet { content } => EventKind::TweetCreated {
                id: TweetId::new(self.tweet_count()),
                content,
            },
            Command::EditTweet { id, content } => {
                self.check_mutable(caller, id)?;
                EventKind::TweetEdited { id, content }
            }
            Command::DeleteTweet { id } => {
                self.check_mutable(caller, id)?;
                EventKind::TweetDeleted { id }
            }
            Command::Deposit { amount } => {
                if amount <= Decimal::ZERO {
                    return Err(Error::InvalidAmount(
                        "Deposit must be positive".to_string(),
                    ));
                }
                if self.balance.checked_add(amount).is_none() {
                    return Err(Error::InvalidAmount("Balance overflow".to_string()));
                }
                EventKind::Deposited { amount }
            }
            Command::Withdraw => {
                if caller != &self.owner {
                    return Err(Error::Unauthorized(UnauthorizedReason::NotOwner));
                }
                EventKind::Withdrawn {
                    to: self.owner.clone(),
                    amount: self.balance,
                }
            }
        };

        seal_event(LedgerEvent {
            sequence: self.next_sequence,
            kind,
            caller: caller.clone(),
            timestamp_nanos: now.timestamp_nanos_opt().unwrap_or(0),
            previous_hash: self.head_hash,
            hash: [0u8; 32],
        })
    }

    /// Mutate state from a validated event
    ///
    /// Authorization is not re-checked here; only structural consistency
    /// with the current state (sequence, hash link, ids) is enforced.
    pub fn apply(&mut self, event: &LedgerEvent) -> Result<()> {
        let delta = self.delta(event)?;

        if let Some(tweet) = delta.tweet {
            match usize::try_from(tweet.id.value()) {
                Ok(index) if index < self.tweets.len() => self.tweets[index] = tweet,
                _ => self.tweets.push(tweet),
            }
        }
        self.balance = delta.balance;
        self.next_sequence = delta.sequence + 1;
        self.head_hash = delta.head_hash;
        Ok(())
    }

    /// State after `event` would be applied, without applying it
    pub fn delta(&self, event: &LedgerEvent) -> Result<StateDelta> {
        if event.sequence != self.next_sequence {
            return Err(Error::InvariantViolation(format!(
                "Expected sequence {}, got {}",
                self.next_sequence, event.sequence
            )));
        }
        if event.previous_hash != self.head_hash {
            return Err(Error::InvariantViolation(format!(
                "Event {} does not link to head",
                event.sequence
            )));
        }

        let mut balance = self.balance;
        let tweet = match &event.kind {
            EventKind::TweetCreated { id, content } => {
                if id.value() != self.tweet_count() {
                    return Err(Error::InvariantViolation(format!(
                        "Tweet {} created out of order",
                        id
                    )));
                }
                Some(Tweet {
                    id: *id,
                    author: event.caller.clone(),
                    content: content.clone(),
                    is_deleted: false,
                    created_at: event.timestamp(),
                })
            }
            EventKind::TweetEdited { id, content } => {
                let mut tweet = self.existing(*id)?.clone();
                tweet.content = content.clone();
                Some(tweet)
            }
            EventKind::TweetDeleted { id } => {
                let mut tweet = self.existing(*id)?.clone();
                tweet.is_deleted = true;
                Some(tweet)
            }
            EventKind::Deposited { amount } => {
                balance = balance
                    .checked_add(*amount)
                    .ok_or_else(|| Error::InvariantViolation("Balance overflow".to_string()))?;
                None
            }
            EventKind::Withdrawn { .. } => {
                balance = Decimal::ZERO;
                None
            }
        };

        Ok(StateDelta {
            sequence: event.sequence,
            head_hash: event.hash,
            tweet,
            balance,
        })
    }

    fn check_mutable(&self, caller: &Principal, id: TweetId) -> Result<()> {
        let tweet = self.get_tweet(id)?;
        if &tweet.author != caller {
            return Err(Error::Unauthorized(UnauthorizedReason::NotAuthor));
        }
        if tweet.is_deleted {
            return Err(Error::AlreadyDeleted(id));
        }
        Ok(())
    }

    fn existing(&self, id: TweetId) -> Result<&Tweet> {
        self.get_tweet(id)
            .map_err(|_| Error::InvariantViolation(format!("Event targets missing tweet {}", id)))
    }
}
