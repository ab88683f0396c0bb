//! Data types for the caption crawler
//!
//! The catalog forms a strict tree: [`Series`] owns its [`Season`]s and each
//! season owns its [`Episode`]s. Children point back at their parents through
//! shared, immutable identity records ([`SeriesRef`], [`SeasonRef`]) so an
//! episode task can be moved onto its own Tokio task without borrowing the tree.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Season number used when the catalog label has no number.
pub const UNNUMBERED_SEASON: &str = "0";

/// Identity of a series, shared read-only by its seasons and episodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesRef {
    /// Opaque catalog identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// Identity of a season, shared read-only by its episodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonRef {
    /// Owning series
    pub series: Arc<SeriesRef>,
    /// Season number as used in catalog URLs ("0" when unnumbered)
    pub number: String,
}

/// A series discovered in the collection listing
#[derive(Debug, Clone)]
pub struct Series {
    pub info: Arc<SeriesRef>,
    pub seasons: Vec<Season>,
}

impl Series {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            info: Arc::new(SeriesRef {
                id: id.into(),
                name: name.into(),
            }),
            seasons: Vec::new(),
        }
    }
}

/// A season of a series
#[derive(Debug, Clone)]
pub struct Season {
    pub info: Arc<SeasonRef>,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn new(series: &Arc<SeriesRef>, number: impl Into<String>) -> Self {
        Self {
            info: Arc::new(SeasonRef {
                series: Arc::clone(series),
                number: number.into(),
            }),
            episodes: Vec::new(),
        }
    }
}

/// An episode and the caption artifact it points to
#[derive(Debug, Clone)]
pub struct Episode {
    /// Owning season
    pub season: Arc<SeasonRef>,
    /// Episode number as listed by the catalog
    pub number: String,
    /// Episode title
    pub title: String,
    /// Episode identifier
    pub id: String,
    /// Caption/content identifier
    pub content_id: String,
}

impl Episode {
    pub fn series(&self) -> &SeriesRef {
        &self.season.series
    }

    pub fn ledger_key(&self) -> LedgerKey {
        LedgerKey::new(&self.id, &self.content_id)
    }
}

/// Dedup key for one caption artifact.
///
/// Plain concatenation of episode id and content id, without a delimiter, so
/// ledgers written by earlier versions of the tool stay valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerKey(String);

impl LedgerKey {
    pub fn new(episode_id: &str, content_id: &str) -> Self {
        let mut key = String::with_capacity(episode_id.len() + content_id.len());
        key.push_str(episode_id);
        key.push_str(content_id);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LedgerKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Catalog entries returned by a parser.
///
/// Entries that could not be parsed are not fatal; their reasons are kept in
/// `rejected` so the caller can log them.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    /// Well-formed entries in catalog order
    pub items: Vec<T>,
    /// One message per malformed entry
    pub rejected: Vec<String>,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, rejected: Vec<String>) -> Self {
        Self { items, rejected }
    }

    /// Listing with no entries at all
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Accumulator for accepted captions, shared by all episode tasks
#[derive(Debug, Default)]
pub struct RunStats {
    seasons: Mutex<HashSet<(String, String)>>,
    episodes: AtomicUsize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted caption for `episode`.
    pub async fn record(&self, episode: &Episode) {
        self.seasons
            .lock()
            .await
            .insert((episode.series().id.clone(), episode.season.number.clone()));
        self.episodes.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn summary(&self) -> RunSummary {
        RunSummary {
            seasons: self.seasons.lock().await.len(),
            episodes: self.episodes.load(Ordering::SeqCst),
        }
    }
}

/// End-of-run totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Distinct (series, season) pairs with at least one accepted caption
    pub seasons: usize,
    /// Accepted captions
    pub episodes: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawled {} series/seasons, {} episodes in total",
            self.seasons, self.episodes
        )
    }
}
