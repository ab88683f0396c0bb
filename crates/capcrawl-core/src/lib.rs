//! Closed-caption crawler core library
//!
//! This crate walks a streaming catalog (collection → series → season →
//! episode), fetches the caption of every episode, and keeps the ones that
//! are closed captions rather than plain subtitles.
//!
//! # Features
//! - One global concurrency cap for every request of a crawl
//! - Structured fan-out: a failed crawl cancels all in-flight work
//! - Resumable runs through a persisted ledger of handled captions
//! - Heuristic caption classification with a human review fallback

pub mod catalog;
pub mod classifier;
pub mod client;
pub mod crawler;
pub mod error;
pub mod ledger;
pub mod parser;
mod pipeline;
pub mod review;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use catalog::{Catalog, CatalogEndpoints};
pub use classifier::{classify, Classifier, Decision, Verdict};
pub use client::{ClientConfig, FetchRequest, FetchResponse, Fetcher, HttpTransport, Route, Transport};
pub use crawler::{Crawler, CrawlerConfig};
pub use error::{CrawlError, Result};
pub use ledger::Ledger;
pub use pipeline::EpisodeOutcome;
pub use review::{ReviewContext, ReviewPrompt, ScriptedPrompt};
pub use store::{ArtifactStore, CaptionHost};
pub use types::{Episode, LedgerKey, Listing, RunSummary, Season, Series};
