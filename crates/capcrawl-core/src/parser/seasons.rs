//! Series detail parser
//!
//! Extracts the seasons of a series from the first component of the series
//! detail document.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CrawlError, Result};
use crate::types::{Listing, Season, SeriesRef, UNNUMBERED_SEASON};

use super::{parse_document, parse_entry};

#[derive(Deserialize)]
struct SeriesDocument {
    components: Vec<Component>,
}

#[derive(Deserialize)]
struct Component {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct SeasonItem {
    name: String,
}

/// Derive the season number from a catalog label.
///
/// The last space-separated token of the label is the number; a label
/// without a space has no number and maps to `"0"`.
///
/// # Examples
/// ```
/// use capcrawl_core::parser::parse_season_number;
///
/// assert_eq!(parse_season_number("Season 3"), "3");
/// assert_eq!(parse_season_number("Specials"), "0");
/// ```
pub fn parse_season_number(label: &str) -> String {
    if label.contains(' ') {
        label.rsplit(' ').next().unwrap_or_default().to_string()
    } else {
        UNNUMBERED_SEASON.to_string()
    }
}

/// Parse the seasons of `series` from its detail document.
///
/// # Returns
/// * `Ok(Listing<Season>)` with one season per labelled item
/// * `Err(CrawlError::Parse)` if the document has no components
pub fn parse_seasons(body: &str, series: &Arc<SeriesRef>) -> Result<Listing<Season>> {
    let document: SeriesDocument = parse_document(body, "series detail")?;
    let component = document
        .components
        .into_iter()
        .next()
        .ok_or_else(|| CrawlError::Parse("series detail: no components".to_string()))?;

    let mut items = Vec::with_capacity(component.items.len());
    let mut rejected = Vec::new();

    for (index, raw) in component.items.into_iter().enumerate() {
        match parse_entry::<SeasonItem>(raw, index) {
            Ok(item) => items.push(Season::new(series, parse_season_number(&item.name))),
            Err(reason) => rejected.push(reason),
        }
    }

    Ok(Listing::new(items, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Arc<SeriesRef> {
        Arc::new(SeriesRef {
            id: "A1".to_string(),
            name: "Foo".to_string(),
        })
    }

    #[test]
    fn test_parse_season_number() {
        assert_eq!(parse_season_number("Season 1"), "1");
        assert_eq!(parse_season_number("Season 12"), "12");
        assert_eq!(parse_season_number("The Final Season 4"), "4");
        assert_eq!(parse_season_number("Movies"), "0");
        assert_eq!(parse_season_number(""), "0");
    }

    #[test]
    fn test_parse_season_number_trailing_space() {
        // Same as splitting on single spaces and taking the last token
        assert_eq!(parse_season_number("Season "), "");
    }

    #[test]
    fn test_parse_seasons_uses_first_component() {
        let body = r#"{"components": [
            {"items": [{"name": "Season 1"}, {"name": "Season 2"}, {"name": "Extras"}]},
            {"items": [{"name": "Season 9"}]}
        ]}"#;

        let listing = parse_seasons(body, &series()).unwrap();
        let numbers: Vec<_> = listing
            .items
            .iter()
            .map(|s| s.info.number.as_str())
            .collect();
        assert_eq!(numbers, ["1", "2", "0"]);
        assert_eq!(listing.items[0].info.series.name, "Foo");
    }

    #[test]
    fn test_parse_seasons_rejects_unnamed_item() {
        let body = r#"{"components": [{"items": [{"id": 1}, {"name": "Season 2"}]}]}"#;
        let listing = parse_seasons(body, &series()).unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.rejected.len(), 1);
    }

    #[test]
    fn test_parse_seasons_component_without_items() {
        let listing = parse_seasons(r#"{"components": [{}]}"#, &series()).unwrap();
        assert!(listing.items.is_empty());
    }

    #[test]
    fn test_parse_seasons_no_components() {
        assert!(matches!(
            parse_seasons(r#"{"components": []}"#, &series()),
            Err(CrawlError::Parse(_))
        ));
        assert!(parse_seasons("{}", &series()).is_err());
    }
}
