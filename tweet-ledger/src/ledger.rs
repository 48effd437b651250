//! Main ledger orchestration layer
//!
//! This module ties together storage, state recovery, metrics and the actor
//! into the public tweet ledger API.
//!
//! # Example
//!
//! ```no_run
//! use tweet_ledger::{Config, Ledger, Principal};
//!
//! #[tokio::main]
//! async fn main() -> tweet_ledger::Result<()> {
//!     let mut config = Config::default();
//!     config.owner = Some("deployer".to_string());
//!     let ledger = Ledger::open(config).await?;
//!
//!     let alice = Principal::new("alice");
//!     let id = ledger.create_tweet(&alice, "Hello, world!").await?;
//!     ledger.edit_tweet(&alice, id, "Goodbye, world!").await?;
//!     let tweets = ledger.get_tweets().await?;
//!     assert_eq!(tweets.len(), 1);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    crypto::verify_chain,
    metrics::Metrics,
    state::{Command, TweetLedger},
    types::{EventKind, LedgerEvent, LedgerSummary, Principal, Tweet, TweetId, Withdrawal},
    Config, Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for all state access
    handle: LedgerHandle,

    /// Direct storage access (for audit reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    ///
    /// A fresh store takes its owner from `config.owner`. An existing store
    /// keeps the owner it was created with; configuring a different one fails.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let owner = Self::resolve_owner(&storage, config.owner_principal())?;

        let state = Self::recover(&storage, owner)?;

        let metrics = Metrics::new()?;
        metrics.set_active_tweets(state.get_tweets().len());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            owner = %state.owner(),
            tweets = state.tweet_count(),
            events = state.next_sequence(),
            "Ledger opened"
        );

        let handle = spawn_ledger_actor(
            state,
            storage.clone(),
            metrics.clone(),
            config.mailbox_capacity,
        );

        Ok(Self {
            handle,
            storage,
            metrics,
            config,
        })
    }

    fn resolve_owner(storage: &Storage, configured: Option<Principal>) -> Result<Principal> {
        match (storage.load_owner()?, configured) {
            (Some(stored), Some(configured)) if stored != configured => Err(Error::Config(
                format!("Ledger is owned by {}, not {}", stored, configured),
            )),
            (Some(stored), _) => Ok(stored),
            (None, Some(configured)) => storage.init_owner(&configured),
            (None, None) => Err(Error::Config(
                "No owner configured for a fresh ledger".to_string(),
            )),
        }
    }

    /// Verify and replay the event log, then cross-check it against the
    /// persisted records
    fn recover(storage: &Storage, owner: Principal) -> Result<TweetLedger> {
        let events = storage.load_events()?;
        verify_chain(&events)?;
        let state = TweetLedger::replay(owner, events)?;

        if storage.load_tweets()? != state.records() {
            return Err(Error::InvariantViolation(
                "Persisted tweets diverge from event log".to_string(),
            ));
        }
        if storage.load_balance()? != state.balance() {
            return Err(Error::InvariantViolation(
                "Persisted balance diverges from event log".to_string(),
            ));
        }

        Ok(state)
    }

    /// Append a tweet authored by `caller`
    pub async fn create_tweet(&self, caller: &Principal, content: impl Into<String>) -> Result<TweetId> {
        let event = self
            .handle
            .execute(caller.clone(), Command::CreateTweet { content: content.into() })
            .await?;

        event.kind.tweet_id().ok_or_else(|| {
            Error::InvariantViolation(format!("Create produced {} event", event.kind.name()))
        })
    }

    /// Replace the content of one of the caller's tweets
    pub async fn edit_tweet(
        &self,
        caller: &Principal,
        id: TweetId,
        content: impl Into<String>,
    ) -> Result<()> {
        self.handle
            .execute(caller.clone(), Command::EditTweet { id, content: content.into() })
            .await?;
        Ok(())
    }

    /// Soft-delete one of the caller's tweets
    pub async fn delete_tweet(&self, caller: &Principal, id: TweetId) -> Result<()> {
        self.handle
            .execute(caller.clone(), Command::DeleteTweet { id })
            .await?;
        Ok(())
    }

    /// Snapshot of non-deleted tweets in id order
    pub async fn get_tweets(&self) -> Result<Vec<Tweet>> {
        self.handle.get_tweets().await
    }

    /// Any record by id, deleted or not
    pub async fn get_tweet(&self, id: TweetId) -> Result<Tweet> {
        self.handle.get_tweet(id).await
    }

    /// Record an incoming transfer
    pub async fn deposit(&self, from: &Principal, amount: Decimal) -> Result<()> {
        self.handle
            .execute(from.clone(), Command::Deposit { amount })
            .await?;
        Ok(())
    }

    /// Release the entire balance to the owner
    pub async fn withdraw(&self, caller: &Principal) -> Result<Withdrawal> {
        let event = self
            .handle
            .execute(caller.clone(), Command::Withdraw)
            .await?;

        match event.kind {
            EventKind::Withdrawn { to, amount } => {
                tracing::info!(to = %to, amount = %amount, "Balance withdrawn");
                Ok(Withdrawal { to, amount })
            }
            other => Err(Error::InvariantViolation(format!(
                "Withdraw produced {} event",
                other.name()
            ))),
        }
    }

    /// Scalar state snapshot
    pub async fn summary(&self) -> Result<LedgerSummary> {
        self.handle.summary().await
    }

    /// Accumulated balance
    pub async fn balance(&self) -> Result<Decimal> {
        Ok(self.summary().await?.balance)
    }

    /// Full committed event log
    pub fn event_log(&self) -> Result<Vec<LedgerEvent>> {
        self.storage.load_events()
    }

    /// Verify sequence continuity and hash linkage of the event log
    ///
    /// Returns the number of events checked. Safe to call while writes are
    /// in flight: the log and head come from the same storage snapshot.
    pub fn verify_audit_chain(&self) -> Result<u64> {
        let (events, head) = self.storage.load_chain()?;
        verify_chain(&events)?;

        if let Some(head) = head {
            let last = events.last().map(|e| (e.sequence, e.hash));
            if last != Some((head.sequence, head.hash)) {
                return Err(Error::InvariantViolation(
                    "Chain head does not match last event".to_string(),
                ));
            }
        }

        Ok(events.len() as u64)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
