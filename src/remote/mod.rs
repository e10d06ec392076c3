//! Abstraction over the remote named-file collection the engine mirrors.
//!
//! A collection is a single versioned object holding several named entries
//! and exactly one last-modified timestamp. The engine only ever reads it
//! through [`RemoteCollection`], so tests can substitute a scripted double
//! for the real Gist client.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Factor applied to the poll interval on every rate-limit signal and
/// divided back out on every clean fetch.
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Ceiling for the adaptive poll interval.
pub const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Poll floor for authenticated accessors (5000 requests per hour).
pub const MIN_INTERVAL_AUTHENTICATED: Duration = Duration::from_secs(1);

/// Poll floor for anonymous accessors (60 requests per hour).
pub const MIN_INTERVAL_ANONYMOUS: Duration = Duration::from_secs(60);

/// One named file as currently stored remotely.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteEntry {
    /// Entry name, unique within one fetch.
    pub name: String,
    /// Raw entry bytes. Empty when the entry is deleted.
    pub content: Vec<u8>,
    /// Whether the remote marks this entry as removed.
    pub deleted: bool,
    /// Collection-wide update time shared by every entry of one fetch.
    pub collection_updated_at: DateTime<Utc>,
}

/// Result of a single successful fetch of the whole collection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Collection {
    updated_at: DateTime<Utc>,
    entries: BTreeMap<String, RemoteEntry>,
}

impl Collection {
    /// Creates an empty collection stamped with `updated_at`.
    #[must_use]
    pub const fn new(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            entries: BTreeMap::new(),
        }
    }

    /// Adds a live entry. The entry inherits the collection timestamp.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.push_file(name, content);
        self
    }

    /// Adds an entry the remote reports as deleted.
    #[must_use]
    pub fn with_deleted(mut self, name: impl Into<String>) -> Self {
        self.push_deleted(name);
        self
    }

    /// Inserts a live entry, replacing any entry with the same name.
    pub fn push_file(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.insert(name.into(), content.into(), false);
    }

    /// Inserts a deleted entry, replacing any entry with the same name.
    pub fn push_deleted(&mut self, name: impl Into<String>) {
        self.insert(name.into(), Vec::new(), true);
    }

    fn insert(&mut self, name: String, content: Vec<u8>, deleted: bool) {
        let entry = RemoteEntry {
            name: name.clone(),
            content,
            deleted,
            collection_updated_at: self.updated_at,
        };
        self.entries.insert(name, entry);
    }

    /// Collection-wide last-modified timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteEntry> {
        self.entries.get(name)
    }

    /// Iterates over entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &RemoteEntry> {
        self.entries.values()
    }

    /// Number of entries, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Future returned by accessor operations.
pub type RemoteFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Read access to a remote collection.
pub trait RemoteCollection {
    /// Accessor specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches every entry together with the collection timestamp.
    fn fetch_all(&self) -> RemoteFuture<'_, Collection, Self::Error>;

    /// Classifies `error` as a rate-limit signal.
    fn is_rate_limited(&self, error: &Self::Error) -> bool;

    /// Lowest poll interval the remote tolerates for this accessor's
    /// authentication mode.
    fn minimum_interval(&self) -> Duration;
}
