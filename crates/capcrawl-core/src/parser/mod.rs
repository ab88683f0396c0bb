//! JSON parsers for the catalog API
//!
//! This module contains parsers for the three catalog documents:
//! - `collection`: the hub collection listing every series
//! - `seasons`: the series detail document listing its seasons
//! - `episodes`: the per-season episode listing
//!
//! Each parser returns a [`Listing`](crate::types::Listing): a document that is
//! not shaped like the expected listing is an error, while a single malformed
//! entry is only reported in `rejected`.

pub mod collection;
pub mod episodes;
pub mod seasons;

// Re-export main parsing functions
pub use collection::parse_collection;
pub use episodes::{parse_content_id, parse_episodes};
pub use seasons::{parse_season_number, parse_seasons};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CrawlError, Result};

/// Decode the whole document, keeping each entry as raw JSON.
fn parse_document<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| CrawlError::Parse(format!("{what}: {e}")))
}

/// Decode one entry, describing it by position on failure.
fn parse_entry<T: DeserializeOwned>(value: Value, index: usize) -> std::result::Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("entry {index}: {e}"))
}

/// Accept either a JSON string or a JSON number and keep it as text.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
