//! Collection listing parser
//!
//! Extracts the series of a hub collection from its JSON document.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Listing, Series};

use super::{parse_document, parse_entry, string_or_number};

#[derive(Deserialize)]
struct CollectionDocument {
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct CollectionItem {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    metrics_info: MetricsInfo,
}

#[derive(Deserialize)]
struct MetricsInfo {
    target_name: String,
}

/// Parse the collection listing into series.
///
/// # Arguments
/// * `body` - Raw JSON of the collection document
///
/// # Returns
/// * `Ok(Listing<Series>)` with one series per well-formed item
/// * `Err(CrawlError::Parse)` if the document has no `items` array
pub fn parse_collection(body: &str) -> Result<Listing<Series>> {
    let document: CollectionDocument = parse_document(body, "collection listing")?;

    let mut items = Vec::with_capacity(document.items.len());
    let mut rejected = Vec::new();

    for (index, raw) in document.items.into_iter().enumerate() {
        match parse_entry::<CollectionItem>(raw, index) {
            Ok(item) => items.push(Series::new(item.id, item.metrics_info.target_name)),
            Err(reason) => rejected.push(reason),
        }
    }

    Ok(Listing::new(items, rejected))
}
