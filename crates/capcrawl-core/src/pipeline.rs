//! Per-episode work: ledger check, caption fetch, classification, storage

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::classifier::{is_excluded, Decision};
use crate::client::Route;
use crate::crawler::RunContext;
use crate::error::{CrawlError, Result};
use crate::types::Episode;

/// What happened to one episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// Key already in the ledger or claimed by a sibling, nothing fetched
    AlreadyProcessed,
    /// Title marks a subtitled release, nothing fetched
    Excluded,
    /// No caption could be fetched
    Unavailable,
    /// Caption stored at `path`; `reviewed` tells whether a human confirmed it
    Accepted { path: PathBuf, reviewed: bool },
    /// Caption fetched but discarded
    Rejected,
    /// A file for this episode could not be written; retried on the next run
    WriteFailed(PathBuf),
}

impl EpisodeOutcome {
    /// Whether the episode's key goes into the ledger.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Self::AlreadyProcessed | Self::WriteFailed(_))
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Run the pipeline for `episode`.
///
/// The key is claimed before any work, so an episode listed twice is only
/// attempted once. It is recorded once the attempt is over unless a file
/// write failed. Only fatal errors are returned.
#[instrument(skip_all, fields(series = %episode.series().name, season = %episode.season.number, episode = %episode.number))]
pub(crate) async fn process_episode(ctx: &RunContext, episode: Episode) -> Result<EpisodeOutcome> {
    let key = episode.ledger_key();
    if !ctx.ledger.claim(&key).await {
        info!(title = %episode.title, "already crawled");
        return Ok(EpisodeOutcome::AlreadyProcessed);
    }

    let outcome = match attempt(ctx, &episode).await {
        Ok(outcome) => outcome,
        Err(e) => {
            ctx.ledger.release(&key).await;
            return Err(e);
        }
    };

    if outcome.is_recorded() {
        ctx.ledger.commit(key).await;
    } else {
        ctx.ledger.release(&key).await;
    }
    debug!(?outcome, "episode done");
    Ok(outcome)
}

async fn attempt(ctx: &RunContext, episode: &Episode) -> Result<EpisodeOutcome> {
    if is_excluded(episode) {
        info!(title = %episode.title, "not a dubbed release, skipped");
        return Ok(EpisodeOutcome::Excluded);
    }

    let url = match ctx.captions.caption_url(&episode.content_id) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "cannot derive caption url");
            return Ok(EpisodeOutcome::Unavailable);
        }
    };

    let response = match ctx.fetcher.fetch(&url, &[], Route::Direct).await {
        Ok(response) => response,
        Err(e @ CrawlError::ProxyUnreachable { .. }) => return Err(e),
        Err(e) => {
            warn!(url, error = %e, "caption request failed");
            return Ok(EpisodeOutcome::Unavailable);
        }
    };

    if !response.is_ok() {
        info!(url, status = response.status, "caption unavailable");
        return Ok(EpisodeOutcome::Unavailable);
    }

    let decision = match ctx.classifier.decide(episode, &response.body).await {
        Ok(decision) => decision,
        Err(CrawlError::Io { path, source }) => return Ok(write_failed(path, &source)),
        Err(e) => return Err(e),
    };

    match decision {
        Decision::Accepted { reviewed } => {
            let path = match ctx.store.save(episode, &response.body).await {
                Ok(path) => path,
                Err(CrawlError::Io { path, source }) => return Ok(write_failed(path, &source)),
                Err(e) => return Err(e),
            };
            ctx.stats.record(episode).await;
            Ok(EpisodeOutcome::Accepted { path, reviewed })
        }
        Decision::Rejected => Ok(EpisodeOutcome::Rejected),
    }
}

fn write_failed(path: PathBuf, source: &std::io::Error) -> EpisodeOutcome {
    warn!(path = %path.display(), error = %source, "could not write caption file, skipping episode");
    EpisodeOutcome::WriteFailed(path)
}
