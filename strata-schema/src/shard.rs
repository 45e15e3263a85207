//! Storage shard contract
//!
//! The engine's only view of storage: read/write the schema metadata
//! blob, probe the document count for id placement, and ask whether the
//! shard is accepting writes. Everything else about storage lives
//! elsewhere.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Narrow storage contract consumed by the schema engine.
pub trait Shard {
    /// Number of documents currently in the shard.
    fn doccount(&self) -> Result<u64>;

    /// Whether the shard is accepting new documents.
    fn is_active(&self) -> bool;

    /// Read a metadata blob.
    fn metadata(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a metadata blob.
    fn set_metadata(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Next value of the shard's auto-increment id counter.
    ///
    /// Id value `0` requests storage-side assignment; the counter backs
    /// that contract.
    fn next_id(&self) -> Result<u64>;
}

/// The set of shards a database is split across.
#[derive(Debug, Default)]
pub struct ShardSet<S: Shard> {
    shards: Vec<S>,
}

impl<S: Shard> ShardSet<S> {
    pub fn new(shards: Vec<S>) -> Self {
        ShardSet { shards }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn get(&self, n: usize) -> Option<&S> {
        self.shards.get(n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.shards.iter()
    }
}

/// In-memory shard for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryShard {
    active: bool,
    doccount: AtomicU64,
    counter: AtomicU64,
    metadata: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryShard {
    pub fn new() -> Self {
        MemoryShard {
            active: true,
            ..MemoryShard::default()
        }
    }

    /// An inactive shard, skipped by id placement.
    pub fn inactive() -> Self {
        MemoryShard::default()
    }

    /// Preload the document count (placement decisions read it).
    pub fn with_doccount(self, count: u64) -> Self {
        self.doccount.store(count, Ordering::Relaxed);
        self
    }

    pub fn bump_doccount(&self) {
        self.doccount.fetch_add(1, Ordering::Relaxed);
    }
}

impl Shard for MemoryShard {
    fn doccount(&self) -> Result<u64> {
        Ok(self.doccount.load(Ordering::Relaxed))
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self
            .metadata
            .lock()
            .map_err(|_| Error::client("Shard metadata poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn set_metadata(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut map = self
            .metadata
            .lock()
            .map_err(|_| Error::client("Shard metadata poisoned"))?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
