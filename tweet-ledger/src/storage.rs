//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `events` - Append-only event log (key: sequence, big-endian)
//! - `tweets` - Latest image of every tweet record (key: tweet id, big-endian)
//! - `meta` - Owner, balance and chain head

use crate::{
    error::{Error, Result},
    state::StateDelta,
    types::{LedgerEvent, Principal, Tweet, TweetId},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Column family names
const CF_EVENTS: &str = "events";
const CF_TWEETS: &str = "tweets";
const CF_META: &str = "meta";

/// Meta keys
const META_OWNER: &[u8] = b"owner";
const META_BALANCE: &[u8] = b"balance";
const META_HEAD: &[u8] = b"head";

/// Last committed event position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Sequence of the last event
    pub sequence: u64,
    /// Hash of the last event
    pub hash: [u8; 32],
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.db.path()).finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events(config)),
            ColumnFamilyDescriptor::new(CF_TWEETS, Self::cf_options_tweets()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB");

        Ok(Self { db })
    }

    /// Open an existing database without write access
    ///
    /// Every commit against a read-only store fails with [`Error::Storage`].
    pub fn open_read_only(config: &Config) -> Result<Self> {
        let db = DB::open_cf_for_read_only(
            &Options::default(),
            &config.data_dir,
            [CF_EVENTS, CF_TWEETS, CF_META],
            false,
        )?;

        tracing::info!(path = ?config.data_dir, "Opened RocksDB read-only");

        Ok(Self { db })
    }

    fn cf_options_events(config: &Config) -> Options {
        let mut opts = Options::default();
        if config.rocksdb.compress_events {
            opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
            opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        }
        opts
    }

    fn cf_options_tweets() -> Options {
        let mut opts = Options::default();
        // Tweets are read on every recovery, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Owner

    /// Owner recorded at first open
    pub fn load_owner(&self) -> Result<Option<Principal>> {
        let cf = self.cf_handle(CF_META)?;
        match self.db.get_cf(cf, META_OWNER)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Record `owner` for a fresh store, or return the stored owner
    ///
    /// Ownership is fixed once: a store that already has an owner keeps it.
    pub fn init_owner(&self, owner: &Principal) -> Result<Principal> {
        if let Some(existing) = self.load_owner()? {
            return Ok(existing);
        }

        let cf = self.cf_handle(CF_META)?;
        self.db.put_cf(cf, META_OWNER, bincode::serialize(owner)?)?;

        tracing::info!(owner = %owner, "Ledger owner recorded");
        Ok(owner.clone())
    }

    // Commit

    /// Persist an event with its post-image (atomic)
    pub fn commit(&self, event: &LedgerEvent, delta: &StateDelta) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Event
        let cf_events = self.cf_handle(CF_EVENTS)?;
        batch.put_cf(cf_events, event.sequence.to_be_bytes(), bincode::serialize(event)?);

        // 2. Tweet record
        if let Some(tweet) = &delta.tweet {
            let cf_tweets = self.cf_handle(CF_TWEETS)?;
            batch.put_cf(cf_tweets, tweet.id.to_key(), bincode::serialize(tweet)?);
        }

        // 3. Metadata
        let cf_meta = self.cf_handle(CF_META)?;
        batch.put_cf(cf_meta, META_BALANCE, bincode::serialize(&delta.balance)?);
        let head = ChainHead {
            sequence: delta.sequence,
            hash: delta.head_hash,
        };
        batch.put_cf(cf_meta, META_HEAD, bincode::serialize(&head)?);

        self.db.write(batch)?;

        tracing::debug!(
            sequence = event.sequence,
            kind = event.kind.name(),
            "Event committed"
        );

        Ok(())
    }

    // Reads

    /// Full event log in sequence order
    pub fn load_events(&self) -> Result<Vec<LedgerEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;

        let mut events = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            events.push(bincode::deserialize(&value)?);
        }

        Ok(events)
    }

    /// Persisted tweet records in id order
    pub fn load_tweets(&self) -> Result<Vec<Tweet>> {
        let cf = self.cf_handle(CF_TWEETS)?;

        let mut tweets = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            tweets.push(bincode::deserialize(&value)?);
        }

        Ok(tweets)
    }

    /// Persisted record for `id`
    pub fn get_tweet(&self, id: TweetId) -> Result<Tweet> {
        let cf = self.cf_handle(CF_TWEETS)?;

        let value = self
            .db
            .get_cf(cf, id.to_key())?
            .ok_or(Error::NotFound(id))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Persisted balance
    pub fn load_balance(&self) -> Result<Decimal> {
        let cf = self.cf_handle(CF_META)?;
        match self.db.get_cf(cf, META_BALANCE)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Last committed event position
    pub fn load_head(&self) -> Result<Option<ChainHead>> {
        let cf = self.cf_handle(CF_META)?;
        match self.db.get_cf(cf, META_HEAD)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Event log and chain head read from one snapshot
    ///
    /// Commits landing during the read are invisible to both halves.
    pub fn load_chain(&self) -> Result<(Vec<LedgerEvent>, Option<ChainHead>)> {
        let snapshot = self.db.snapshot();

        let cf_events = self.cf_handle(CF_EVENTS)?;
        let mut events = Vec::new();
        for item in snapshot.iterator_cf(cf_events, IteratorMode::Start) {
            let (_, value) = item?;
            events.push(bincode::deserialize(&value)?);
        }

        let cf_meta = self.cf_handle(CF_META)?;
        let head = match snapshot.get_cf(cf_meta, META_HEAD)? {
            Some(value) => Some(bincode::deserialize(&value)?),
            None => None,
        };

        Ok((events, head))
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let total_events = self
            .load_head()?
            .map(|head| head.sequence + 1)
            .unwrap_or(0);

        let cf_tweets = self.cf_handle(CF_TWEETS)?;
        let total_tweets = self.db.iterator_cf(cf_tweets, IteratorMode::Start).count() as u64;

        Ok(StorageStats {
            total_events,
            total_tweets,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Committed events
    pub total_events: u64,
    /// Tweet slots, deleted ones included
    pub total_tweets: u64,
}
