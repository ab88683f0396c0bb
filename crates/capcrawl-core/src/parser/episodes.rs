//! Season episode listing parser
//!
//! Extracts episodes, including the caption content id hidden in the
//! personalization field, from a season listing.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CrawlError, Result};
use crate::types::{Episode, Listing, SeasonRef};

use super::{parse_document, parse_entry, string_or_number};

/// Separator of the segments in the personalization `eab` field
const EAB_SEPARATOR: &str = "::";

#[derive(Deserialize)]
struct EpisodeDocument {
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct EpisodeItem {
    #[serde(deserialize_with = "string_or_number")]
    number: String,
    name: String,
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    personalization: Personalization,
}

#[derive(Deserialize)]
struct Personalization {
    eab: String,
}

/// Extract the content id from a personalization `eab` value.
///
/// The id is the third `::`-separated segment.
///
/// # Errors
/// Returns `CrawlError::Parse` if the third segment is missing or empty.
///
/// # Examples
/// ```
/// use capcrawl_core::parser::parse_content_id;
///
/// assert_eq!(parse_content_id("EAB::abc::60245832::1234").unwrap(), "60245832");
/// assert!(parse_content_id("EAB::abc").is_err());
/// ```
pub fn parse_content_id(eab: &str) -> Result<String> {
    match eab.split(EAB_SEPARATOR).nth(2) {
        Some(segment) if !segment.is_empty() => Ok(segment.to_string()),
        _ => Err(CrawlError::Parse(format!(
            "eab value has no content id segment: {eab:?}"
        ))),
    }
}

/// Parse the episodes of `season` from its listing document.
///
/// # Returns
/// * `Ok(Listing<Episode>)` with every well-formed episode
/// * `Err(CrawlError::Parse)` if the document has no `items` array
pub fn parse_episodes(body: &str, season: &Arc<SeasonRef>) -> Result<Listing<Episode>> {
    let document: EpisodeDocument = parse_document(body, "season listing")?;

    let mut items = Vec::with_capacity(document.items.len());
    let mut rejected = Vec::new();

    for (index, raw) in document.items.into_iter().enumerate() {
        let item = match parse_entry::<EpisodeItem>(raw, index) {
            Ok(item) => item,
            Err(reason) => {
                rejected.push(reason);
                continue;
            }
        };

        match parse_content_id(&item.personalization.eab) {
            Ok(content_id) => items.push(Episode {
                season: Arc::clone(season),
                number: item.number,
                title: item.name,
                id: item.id,
                content_id,
            }),
            Err(e) => rejected.push(format!("entry {index} ({}): {e}", item.id)),
        }
    }

    Ok(Listing::new(items, rejected))
}
