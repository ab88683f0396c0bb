//! Error types for the caption crawler
//!
//! Every fallible operation in the library returns [`CrawlError`]. Variants are
//! split into fatal ones, which end the whole run before the ledger is saved,
//! and recoverable ones that only affect a single catalog entry.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for crawler operations
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The configured proxy refused or dropped the connection
    #[error("Proxy connection failed, configure a working proxy: {url}")]
    ProxyUnreachable { url: String },

    /// Collection root answered 403 (wrong region)
    #[error("Access denied, use a proxy located in the catalog's region: {url}")]
    RegionBlocked { url: String },

    /// Catalog endpoint answered with a status other than 200
    #[error("Unexpected HTTP status {status}: {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// HTTP request failed for a reason other than the proxy
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog payload or identifier did not have the expected shape
    #[error("Failed to parse catalog data: {0}")]
    Parse(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted ledger is not a JSON array of strings
    #[error("Invalid ledger file {path}: {source}")]
    LedgerFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CrawlError {
    /// Build an [`CrawlError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must terminate the whole run.
    ///
    /// Only [`CrawlError::Parse`] is confined to the entry that produced it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Parse(_))
    }
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;
