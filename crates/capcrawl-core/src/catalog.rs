//! Catalog discovery
//!
//! The catalog is walked in three stages: the collection listing yields
//! series, each series detail document yields seasons, and each season
//! listing yields episodes. This module performs one stage at a time; the
//! fan-out across stages lives in [`crate::crawler`].

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::client::{FetchResponse, Fetcher, Route, LISTING_PARAMS};
use crate::error::{CrawlError, Result};
use crate::parser::{parse_collection, parse_episodes, parse_seasons};
use crate::types::{Episode, Listing, Season, SeasonRef, Series, SeriesRef};

/// Home page, fetched once to obtain a session cookie
pub const DEFAULT_HOME_URL: &str = "https://www.hulu.com";

/// Collection listing every series of the anime hub
pub const DEFAULT_COLLECTION_URL: &str =
    "https://discover.hulu.com/content/v5/view_hubs/anime-tv/collections/4559";

/// Prefix of series detail and season listing URLs
pub const DEFAULT_SERIES_URL: &str = "https://discover.hulu.com/content/v5/hubs/series/";

/// Catalog endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoints {
    pub home_url: String,
    pub collection_url: String,
    /// Series id (and `/season/<n>`) is appended verbatim
    pub series_url: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_string(),
            collection_url: DEFAULT_COLLECTION_URL.to_string(),
            series_url: DEFAULT_SERIES_URL.to_string(),
        }
    }
}

impl CatalogEndpoints {
    /// Endpoints rooted at `base`, with the same paths as the real catalog.
    ///
    /// Handy for pointing the crawler at a mirror or a mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            home_url: format!("{base}/"),
            collection_url: format!("{base}/content/v5/view_hubs/anime-tv/collections/4559"),
            series_url: format!("{base}/content/v5/hubs/series/"),
        }
    }

    pub fn series_detail_url(&self, series: &SeriesRef) -> String {
        format!("{}{}", self.series_url, series.id)
    }

    pub fn season_url(&self, season: &SeasonRef) -> String {
        format!(
            "{}{}/season/{}",
            self.series_url, season.series.id, season.number
        )
    }
}

/// One-stage-at-a-time access to the catalog
#[derive(Clone)]
pub struct Catalog {
    fetcher: Arc<Fetcher>,
    endpoints: CatalogEndpoints,
}

impl Catalog {
    pub fn new(fetcher: Arc<Fetcher>, endpoints: CatalogEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Visit the home page through the proxy to pick up a session cookie.
    ///
    /// The status is ignored; only an unreachable proxy is an error.
    pub async fn open_session(&self) -> Result<()> {
        let url = &self.endpoints.home_url;
        match self.fetcher.fetch(url, &[], Route::Proxied).await {
            Ok(response) => {
                debug!(url, status = response.status, "session opened");
                Ok(())
            }
            Err(e @ CrawlError::ProxyUnreachable { .. }) => Err(e),
            Err(e) => {
                warn!(url, error = %e, "could not open session, continuing without cookie");
                Ok(())
            }
        }
    }

    /// List every series of the collection.
    ///
    /// # Errors
    /// - `CrawlError::RegionBlocked` - the collection answered 403
    /// - `CrawlError::UnexpectedStatus` - any other non-200 status
    /// - `CrawlError::ProxyUnreachable` / `CrawlError::Http` - request failed
    #[instrument(skip(self))]
    pub async fn list_series(&self) -> Result<Vec<Series>> {
        let url = &self.endpoints.collection_url;
        let response = self.fetcher.fetch(url, LISTING_PARAMS, Route::Proxied).await?;

        if response.status == 403 {
            return Err(CrawlError::RegionBlocked { url: url.clone() });
        }
        let body = expect_ok(url, response)?;
        Ok(accept(url, "series", parse_collection(&body)))
    }

    /// List the seasons of `series`.
    ///
    /// # Errors
    /// - `CrawlError::UnexpectedStatus` - the detail document answered non-200
    /// - `CrawlError::ProxyUnreachable` / `CrawlError::Http` - request failed
    #[instrument(skip_all, fields(series = %series.name))]
    pub async fn list_seasons(&self, series: &Arc<SeriesRef>) -> Result<Vec<Season>> {
        let url = self.endpoints.series_detail_url(series);
        let response = self.fetcher.fetch(&url, LISTING_PARAMS, Route::Proxied).await?;
        let body = expect_ok(&url, response)?;
        Ok(accept(&url, "seasons", parse_seasons(&body, series)))
    }

    /// List the episodes of `season`.
    ///
    /// # Errors
    /// - `CrawlError::UnexpectedStatus` - the season listing answered non-200
    /// - `CrawlError::ProxyUnreachable` / `CrawlError::Http` - request failed
    #[instrument(skip_all, fields(series = %season.series.name, season = %season.number))]
    pub async fn list_episodes(&self, season: &Arc<SeasonRef>) -> Result<Vec<Episode>> {
        let url = self.endpoints.season_url(season);
        let response = self.fetcher.fetch(&url, LISTING_PARAMS, Route::Proxied).await?;
        let body = expect_ok(&url, response)?;
        Ok(accept(&url, "episodes", parse_episodes(&body, season)))
    }
}

/// Body of a 200 response, or the matching fatal error.
fn expect_ok(url: &str, response: FetchResponse) -> Result<String> {
    if response.is_ok() {
        Ok(response.body)
    } else {
        Err(CrawlError::UnexpectedStatus {
            url: url.to_string(),
            status: response.status,
        })
    }
}

/// Keep the well-formed entries of a listing and log the rest.
///
/// A document that could not be parsed at all counts as an empty listing.
fn accept<T>(url: &str, what: &str, parsed: Result<Listing<T>>) -> Vec<T> {
    let listing = match parsed {
        Ok(listing) => listing,
        Err(e) => {
            warn!(url, error = %e, "unreadable {what} listing, treating as empty");
            return Vec::new();
        }
    };

    for reason in &listing.rejected {
        warn!(url, reason = %reason, "skipping malformed {what} entry");
    }
    if listing.items.is_empty() {
        warn!(url, "no {what} found");
    } else {
        debug!(url, count = listing.items.len(), "found {what}");
    }
    listing.items
}
