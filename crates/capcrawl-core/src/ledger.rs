//! Persisted record of captions already handled
//!
//! The ledger is a JSON array of [`LedgerKey`]s. It is read once before a
//! crawl, grows while episode tasks finish, and is written back once after a
//! crawl that ended without a fatal error.

use std::collections::HashSet;
use std::path::Path;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{CrawlError, Result};
use crate::store::write_text;
use crate::types::LedgerKey;

#[derive(Debug, Default)]
struct Entries {
    order: Vec<LedgerKey>,
    index: HashSet<LedgerKey>,
    /// Claimed by a running episode task, not yet recorded
    pending: HashSet<LedgerKey>,
}

/// Append-only set of processed keys, safe to share between tasks
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Entries>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding `keys`; duplicates are dropped.
    pub fn from_keys(keys: impl IntoIterator<Item = LedgerKey>) -> Self {
        let mut entries = Entries::default();
        for key in keys {
            if entries.index.insert(key.clone()) {
                entries.order.push(key);
            }
        }
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Load the ledger at `path`.
    ///
    /// With `resume` unset the previous ledger is discarded and an empty one is
    /// returned. A missing file is not an error: the crawl starts from scratch.
    ///
    /// # Errors
    /// - `CrawlError::Io` if the file exists but cannot be read
    /// - `CrawlError::LedgerFormat` if it is not a JSON array of strings
    pub async fn load(path: &Path, resume: bool) -> Result<Self> {
        if !resume {
            info!(path = %path.display(), "starting with an empty ledger");
            return Ok(Self::new());
        }

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "ledger file not found, crawling every caption");
                return Ok(Self::new());
            }
            Err(e) => return Err(CrawlError::io(path, e)),
        };

        let keys: Vec<LedgerKey> =
            serde_json::from_str(&raw).map_err(|source| CrawlError::LedgerFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), entries = keys.len(), "loaded ledger");
        Ok(Self::from_keys(keys))
    }

    /// Overwrite `path` with every key, in insertion order.
    ///
    /// # Errors
    /// Returns `CrawlError::Io` if the file cannot be written
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = {
            let entries = self.entries.lock().await;
            serde_json::to_string(&entries.order).map_err(|source| CrawlError::LedgerFormat {
                path: path.to_path_buf(),
                source,
            })?
        };
        write_text(path, &json).await?;
        info!(path = %path.display(), "ledger saved");
        Ok(())
    }

    /// Reserve `key` for the calling task.
    ///
    /// Returns `false` if the key is already recorded or claimed by another
    /// task. A successful claim must be followed by [`Ledger::commit`] or
    /// [`Ledger::release`].
    pub async fn claim(&self, key: &LedgerKey) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.index.contains(key) || entries.pending.contains(key) {
            return false;
        }
        entries.pending.insert(key.clone());
        true
    }

    /// Record a claimed key.
    pub async fn commit(&self, key: LedgerKey) {
        let mut entries = self.entries.lock().await;
        entries.pending.remove(&key);
        if entries.index.insert(key.clone()) {
            entries.order.push(key);
        }
    }

    /// Give up a claim without recording the key.
    pub async fn release(&self, key: &LedgerKey) {
        self.entries.lock().await.pending.remove(key);
    }

    pub async fn contains(&self, key: &LedgerKey) -> bool {
        self.entries.lock().await.index.contains(key)
    }

    /// Record `key`; returns `false` if it was already present.
    pub async fn insert(&self, key: LedgerKey) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.index.insert(key.clone()) {
            entries.order.push(key);
            true
        } else {
            false
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the keys in insertion order
    pub async fn keys(&self) -> Vec<LedgerKey> {
        self.entries.lock().await.order.clone()
    }
}
