//! Crawl orchestration
//!
//! The crawl is a tree of Tokio tasks: one task per series, each spawning one
//! task per season, each spawning one task per episode. Every parent waits for
//! all of its children before it completes. A fatal error in any task is
//! returned up the tree; dropping a `JoinSet` aborts the remaining siblings,
//! so nothing keeps running after the crawl has failed.
//!
//! All requests share the [`Fetcher`]'s semaphore, which is the only limit on
//! how much work is in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CatalogEndpoints};
use crate::classifier::Classifier;
use crate::client::{ClientConfig, Fetcher};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::pipeline::{process_episode, EpisodeOutcome};
use crate::review::ReviewPrompt;
use crate::store::{ArtifactStore, CaptionHost};
use crate::types::{RunStats, RunSummary, Season, Series};

/// Default directory for accepted captions
pub const DEFAULT_OUTPUT_DIR: &str = "subtitles";

/// Default directory for captions awaiting review
pub const DEFAULT_INSPECTION_DIR: &str = "check";

/// Everything needed to build a [`Crawler`]
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub client: ClientConfig,
    pub endpoints: CatalogEndpoints,
    pub captions: CaptionHost,
    pub output_dir: PathBuf,
    pub inspection_dir: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            endpoints: CatalogEndpoints::default(),
            captions: CaptionHost::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            inspection_dir: PathBuf::from(DEFAULT_INSPECTION_DIR),
        }
    }
}

/// Shared by every task of one crawl
pub(crate) struct RunContext {
    pub(crate) catalog: Catalog,
    pub(crate) fetcher: Arc<Fetcher>,
    pub(crate) captions: CaptionHost,
    pub(crate) classifier: Arc<Classifier>,
    pub(crate) store: ArtifactStore,
    pub(crate) ledger: Arc<Ledger>,
    pub(crate) stats: RunStats,
}

/// Crawls the catalog and stores every accepted caption
pub struct Crawler {
    catalog: Catalog,
    fetcher: Arc<Fetcher>,
    captions: CaptionHost,
    classifier: Arc<Classifier>,
    store: ArtifactStore,
}

impl Crawler {
    /// Create a crawler talking HTTP as described by `config.client`.
    ///
    /// # Errors
    /// Returns `CrawlError::InvalidConfig` for a zero concurrency limit or an
    /// unusable proxy URL, `CrawlError::Http` if the client cannot be built.
    pub fn new(config: CrawlerConfig, prompt: Arc<dyn ReviewPrompt>) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::with_config(&config.client)?);
        Ok(Self::with_fetcher(fetcher, config, prompt))
    }

    /// Create a crawler around an existing fetcher.
    ///
    /// `config.client` is ignored; the fetcher already carries its settings.
    pub fn with_fetcher(
        fetcher: Arc<Fetcher>,
        config: CrawlerConfig,
        prompt: Arc<dyn ReviewPrompt>,
    ) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&fetcher), config.endpoints),
            fetcher,
            captions: config.captions,
            classifier: Arc::new(Classifier::new(prompt, config.inspection_dir)),
            store: ArtifactStore::new(config.output_dir),
        }
    }

    /// Load the ledger, crawl, and save the ledger.
    ///
    /// The ledger is only written back when the crawl finished without a fatal
    /// error; otherwise the file at `ledger_path` is left untouched.
    ///
    /// # Errors
    /// Any fatal [`CrawlError`](crate::error::CrawlError) from loading, the
    /// crawl itself, or saving.
    pub async fn run(&self, ledger_path: &Path, resume: bool) -> Result<RunSummary> {
        let ledger = Arc::new(Ledger::load(ledger_path, resume).await?);
        let summary = self.crawl(Arc::clone(&ledger)).await?;
        ledger.save(ledger_path).await?;
        Ok(summary)
    }

    /// Crawl the whole catalog against `ledger`.
    ///
    /// Keys of attempted episodes are added to `ledger` as the crawl goes.
    #[instrument(skip_all)]
    pub async fn crawl(&self, ledger: Arc<Ledger>) -> Result<RunSummary> {
        self.catalog.open_session().await?;
        let series = self.catalog.list_series().await?;
        info!(count = series.len(), "series discovered");

        let ctx = Arc::new(RunContext {
            catalog: self.catalog.clone(),
            fetcher: Arc::clone(&self.fetcher),
            captions: self.captions.clone(),
            classifier: Arc::clone(&self.classifier),
            store: self.store.clone(),
            ledger,
            stats: RunStats::new(),
        });

        let mut tasks = JoinSet::new();
        for entry in series {
            tasks.spawn(crawl_series(Arc::clone(&ctx), entry));
        }
        join_children(tasks).await?;

        let summary = ctx.stats.summary().await;
        info!(
            seasons = summary.seasons,
            episodes = summary.episodes,
            "crawl complete"
        );
        Ok(summary)
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }
}

async fn crawl_series(ctx: Arc<RunContext>, mut series: Series) -> Result<()> {
    series.seasons = ctx.catalog.list_seasons(&series.info).await?;

    let mut tasks = JoinSet::new();
    for season in series.seasons {
        tasks.spawn(crawl_season(Arc::clone(&ctx), season));
    }
    join_children(tasks).await.map(drop)
}

async fn crawl_season(ctx: Arc<RunContext>, mut season: Season) -> Result<()> {
    season.episodes = ctx.catalog.list_episodes(&season.info).await?;

    let mut tasks = JoinSet::new();
    for episode in season.episodes {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move { process_episode(&ctx, episode).await });
    }
    let outcomes = join_children(tasks).await?;

    let stored = outcomes.iter().filter(|o| o.is_stored()).count();
    let reviewed = outcomes
        .iter()
        .filter(|o| matches!(o, EpisodeOutcome::Accepted { reviewed: true, .. }))
        .count();
    info!(
        series = %season.info.series.name,
        season = %season.info.number,
        episodes = outcomes.len(),
        stored,
        reviewed,
        "season done"
    );
    Ok(())
}

/// Wait for every child and collect their results.
///
/// On the first fatal error the remaining children are aborted and the error
/// is returned; recoverable errors are logged and dropped.
async fn join_children<T: 'static>(mut tasks: JoinSet<Result<T>>) -> Result<Vec<T>> {
    let mut done = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(value)) => done.push(value),
            Ok(Err(e)) if !e.is_fatal() => warn!(error = %e, "task failed"),
            Ok(Err(e)) => {
                tasks.abort_all();
                return Err(e);
            }
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {}
        }
    }
    Ok(done)
}
