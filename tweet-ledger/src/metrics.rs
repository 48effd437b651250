//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `tweet_ledger_tweets_created_total` - Tweets appended
//! - `tweet_ledger_tweets_edited_total` - Successful edits
//! - `tweet_ledger_tweets_deleted_total` - Successful soft-deletes
//! - `tweet_ledger_withdrawals_total` - Successful withdrawals
//! - `tweet_ledger_rejected_total{reason}` - Operations refused by ledger rules
//! - `tweet_ledger_commit_duration_seconds` - Histogram of commit latencies
//! - `tweet_ledger_active_tweets` - Non-deleted tweets

use crate::types::EventKind;
use crate::{Error, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Tweets appended
    pub tweets_created: IntCounter,

    /// Successful edits
    pub tweets_edited: IntCounter,

    /// Successful soft-deletes
    pub tweets_deleted: IntCounter,

    /// Successful withdrawals
    pub withdrawals: IntCounter,

    /// Rejections by reason
    pub rejected: IntCounterVec,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Non-deleted tweets
    pub active_tweets: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let tweets_created = IntCounter::new(
            "tweet_ledger_tweets_created_total",
            "Total number of tweets created",
        )?;
        registry.register(Box::new(tweets_created.clone()))?;

        let tweets_edited = IntCounter::new(
            "tweet_ledger_tweets_edited_total",
            "Total number of tweet edits",
        )?;
        registry.register(Box::new(tweets_edited.clone()))?;

        let tweets_deleted = IntCounter::new(
            "tweet_ledger_tweets_deleted_total",
            "Total number of tweets deleted",
        )?;
        registry.register(Box::new(tweets_deleted.clone()))?;

        let withdrawals = IntCounter::new(
            "tweet_ledger_withdrawals_total",
            "Total number of owner withdrawals",
        )?;
        registry.register(Box::new(withdrawals.clone()))?;

        let rejected = IntCounterVec::new(
            Opts::new(
                "tweet_ledger_rejected_total",
                "Operations refused by ledger rules",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejected.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "tweet_ledger_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        let active_tweets = IntGauge::new(
            "tweet_ledger_active_tweets",
            "Number of non-deleted tweets",
        )?;
        registry.register(Box::new(active_tweets.clone()))?;

        Ok(Self {
            tweets_created,
            tweets_edited,
            tweets_deleted,
            withdrawals,
            rejected,
            commit_duration,
            active_tweets,
            registry,
        })
    }

    /// Record a committed event
    pub fn record_event(&self, kind: &EventKind) {
        match kind {
            EventKind::TweetCreated { .. } => {
                self.tweets_created.inc();
                self.active_tweets.inc();
            }
            EventKind::TweetEdited { .. } => self.tweets_edited.inc(),
            EventKind::TweetDeleted { .. } => {
                self.tweets_deleted.inc();
                self.active_tweets.dec();
            }
            EventKind::Withdrawn { .. } => self.withdrawals.inc(),
            EventKind::Deposited { .. } => {}
        }
    }

    /// Record a refused operation
    pub fn record_rejection(&self, reason: &str) {
        self.rejected.with_label_values(&[reason]).inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Set active tweet count (after recovery)
    pub fn set_active_tweets(&self, count: usize) {
        self.active_tweets.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}
