//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`TweetLedger`] state, so mutations never interleave
//! - Every mutation is persisted before it becomes visible
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  plan() ──► Storage::commit() ──► apply()            │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::metrics::Metrics;
use crate::state::{Command, TweetLedger};
use crate::types::{LedgerEvent, LedgerSummary, Principal, Tweet, TweetId};
use crate::{Error, Result, Storage};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Validate, persist and apply a mutation
    Execute {
        caller: Principal,
        command: Command,
        response: oneshot::Sender<Result<LedgerEvent>>,
    },

    /// Snapshot of non-deleted tweets
    GetTweets {
        response: oneshot::Sender<Vec<Tweet>>,
    },

    /// Single record by id
    GetTweet {
        id: TweetId,
        response: oneshot::Sender<Result<Tweet>>,
    },

    /// Scalar state snapshot
    GetSummary {
        response: oneshot::Sender<LedgerSummary>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// In-memory state, owned exclusively by this task
    state: TweetLedger,

    /// Storage backend
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: TweetLedger,
        storage: Arc<Storage>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            state,
            storage,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }

        tracing::info!(
            events = self.state.next_sequence(),
            "Ledger actor stopped"
        );
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Execute {
                caller,
                command,
                response,
            } => {
                let result = self.execute(&caller, command);
                let _ = response.send(result);
            }

            LedgerMessage::GetTweets { response } => {
                let _ = response.send(self.state.get_tweets());
            }

            LedgerMessage::GetTweet { id, response } => {
                let _ = response.send(self.state.get_tweet(id).cloned());
            }

            LedgerMessage::GetSummary { response } => {
                let _ = response.send(self.state.summary());
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Plan, persist, then apply
    ///
    /// State is only touched after the storage write succeeds.
    fn execute(&mut self, caller: &Principal, command: Command) -> Result<LedgerEvent> {
        let started = Instant::now();

        let result = self.state.plan(caller, command, Utc::now()).and_then(|event| {
            let delta = self.state.delta(&event)?;
            self.storage.commit(&event, &delta)?;
            self.state.apply(&event)?;
            Ok(event)
        });

        match &result {
            Ok(event) => {
                self.metrics.record_event(&event.kind);
                self.metrics
                    .record_commit_duration(started.elapsed().as_secs_f64());
                let status = event
                    .kind
                    .tweet_id()
                    .and_then(|id| self.state.get_tweet(id).ok())
                    .map(Tweet::status);
                tracing::debug!(
                    sequence = event.sequence,
                    kind = event.kind.name(),
                    tweet_id = ?event.kind.tweet_id(),
                    status = ?status,
                    caller = %caller,
                    "Mutation committed"
                );
            }
            Err(e) if e.is_rejection() => {
                self.metrics.record_rejection(e.rejection_label());
                tracing::warn!(caller = %caller, reason = %e, "Mutation rejected");
            }
            Err(e) => {
                tracing::error!(caller = %caller, "Mutation failed: {}", e);
            }
        }

        result
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Execute a mutation on behalf of `caller`
    pub async fn execute(&self, caller: Principal, command: Command) -> Result<LedgerEvent> {
        self.request(|response| LedgerMessage::Execute {
            caller,
            command,
            response,
        })
        .await?
    }

    /// Snapshot of non-deleted tweets
    pub async fn get_tweets(&self) -> Result<Vec<Tweet>> {
        self.request(|response| LedgerMessage::GetTweets { response })
            .await
    }

    /// Single record by id
    pub async fn get_tweet(&self, id: TweetId) -> Result<Tweet> {
        self.request(|response| LedgerMessage::GetTweet { id, response })
            .await?
    }

    /// Scalar state snapshot
    pub async fn summary(&self) -> Result<LedgerSummary> {
        self.request(|response| LedgerMessage::GetSummary { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: TweetLedger,
    storage: Arc<Storage>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, storage, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnauthorizedReason;
    use crate::Config;

    fn spawn_test_actor(owner: &Principal) -> (LedgerHandle, Arc<Storage>, Metrics, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        let metrics = Metrics::new().unwrap();
        let handle = spawn_ledger_actor(
            TweetLedger::new(owner.clone()),
            storage.clone(),
            metrics.clone(),
            16,
        );
        (handle, storage, metrics, temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _storage, _metrics, _temp) = spawn_test_actor(&Principal::new("owner"));
        handle.shutdown().await.unwrap();

        // Give the actor a moment to drop its mailbox
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(matches!(handle.get_tweets().await, Err(Error::Concurrency(_))));
    }

    #[tokio::test]
    async fn test_actor_execute_persists() {
        let owner = Principal::new("owner");
        let (handle, storage, metrics, _temp) = spawn_test_actor(&owner);

        let event = handle
            .execute(owner.clone(), Command::CreateTweet { content: "Hello, world!".to_string() })
            .await
            .unwrap();
        assert_eq!(event.sequence, 0);

        let tweets = handle.get_tweets().await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(storage.load_events().unwrap(), vec![event]);
        assert_eq!(metrics.tweets_created.get(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_rejection_not_persisted() {
        let owner = Principal::new("owner");
        let (handle, storage, metrics, _temp) = spawn_test_actor(&owner);

        handle
            .execute(owner.clone(), Command::CreateTweet { content: "mine".to_string() })
            .await
            .unwrap();

        let err = handle
            .execute(
                Principal::new("mallory"),
                Command::DeleteTweet { id: TweetId::new(0) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(UnauthorizedReason::NotAuthor)));

        assert_eq!(storage.load_events().unwrap().len(), 1);
        assert_eq!(metrics.rejected.with_label_values(&["not_author"]).get(), 1);
        assert_eq!(handle.summary().await.unwrap().event_count, 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        Storage::open(&config).unwrap().close().unwrap();

        let owner = Principal::new("owner");
        let storage = Arc::new(Storage::open_read_only(&config).unwrap());
        let metrics = Metrics::new().unwrap();
        let handle = spawn_ledger_actor(
            TweetLedger::new(owner.clone()),
            storage.clone(),
            metrics.clone(),
            16,
        );

        let err = handle
            .execute(owner.clone(), Command::CreateTweet { content: "lost".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_rejection());

        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.event_count, 0);
        assert_eq!(summary.tweet_count, 0);
        assert!(handle.get_tweets().await.unwrap().is_empty());
        assert_eq!(metrics.tweets_created.get(), 0);
        assert!(storage.load_events().unwrap().is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_ids() {
        let owner = Principal::new("owner");
        let (handle, _storage, _metrics, _temp) = spawn_test_actor(&owner);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .execute(
                        Principal::new(format!("user-{}", i)),
                        Command::CreateTweet { content: format!("tweet {}", i) },
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            let event = task.await.unwrap();
            ids.push(event.kind.tweet_id().unwrap().value());
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<u64>>());

        let tweets = handle.get_tweets().await.unwrap();
        assert!(tweets.windows(2).all(|pair| pair[0].id < pair[1].id));

        handle.shutdown().await.unwrap();
    }
}
