//! Closed-caption detection
//!
//! Closed captions annotate sounds and speakers with bracketed or
//! parenthesised notes, so a caption with many of them is accepted outright.
//! Everything else goes to a human reviewer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::review::{ReviewContext, ReviewPrompt};
use crate::store::{sanitize_name, write_text};
use crate::types::Episode;

/// Title prefix of subtitled (original-language) releases
pub const SUB_MARKER: &str = "(Sub)";

/// Title prefix of dubbed releases
pub const DUB_MARKER: &str = "(Dub)";

/// A caption needs more than this many `[` or `(` to be accepted unseen
const ANNOTATION_THRESHOLD: usize = 10;

/// Outcome of the heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    NeedsReview,
}

/// Final decision for a caption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the caption; `reviewed` tells whether a human confirmed it
    Accepted { reviewed: bool },
    /// Discard the caption
    Rejected,
}

impl Decision {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Whether `episode` is excluded from crawling by its title.
pub fn is_excluded(episode: &Episode) -> bool {
    episode.title.starts_with(SUB_MARKER)
}

/// Apply the closed-caption heuristic to `text`.
///
/// # Examples
/// ```
/// use capcrawl_core::classifier::{classify, Verdict};
/// # use capcrawl_core::types::{Episode, Season, Series};
/// # let series = Series::new("A1", "Foo");
/// # let episode = Episode {
/// #     season: Season::new(&series.info, "1").info,
/// #     number: "1".into(), title: "Pilot".into(), id: "E1".into(), content_id: "C1".into(),
/// # };
///
/// assert_eq!(classify(&episode, &"[door creaks]\n".repeat(11)), Verdict::Accepted);
/// assert_eq!(classify(&episode, "Hello."), Verdict::NeedsReview);
/// ```
pub fn classify(episode: &Episode, text: &str) -> Verdict {
    let brackets = text.matches('[').count();
    let parens = text.matches('(').count();

    if brackets > ANNOTATION_THRESHOLD
        || parens > ANNOTATION_THRESHOLD
        || episode.title.starts_with(DUB_MARKER)
    {
        Verdict::Accepted
    } else {
        Verdict::NeedsReview
    }
}

/// Heuristic plus human fallback
pub struct Classifier {
    prompt: Arc<dyn ReviewPrompt>,
    inspection_dir: PathBuf,
    /// Held for a whole review so prompts and inspection files never interleave
    interaction: Mutex<()>,
}

impl Classifier {
    pub fn new(prompt: Arc<dyn ReviewPrompt>, inspection_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt,
            inspection_dir: inspection_dir.into(),
            interaction: Mutex::new(()),
        }
    }

    /// Decide whether to keep `text` as the caption of `episode`.
    ///
    /// Inconclusive captions are copied to the inspection directory, the
    /// reviewer is asked, and the copy is removed again whatever the answer.
    ///
    /// # Errors
    /// - `CrawlError::Io` if the inspection copy cannot be written
    /// - any error returned by the [`ReviewPrompt`]
    #[instrument(skip_all, fields(series = %episode.series().name, season = %episode.season.number, episode = %episode.number))]
    pub async fn decide(&self, episode: &Episode, text: &str) -> Result<Decision> {
        if classify(episode, text) == Verdict::Accepted {
            return Ok(Decision::Accepted { reviewed: false });
        }

        let _turn = self.interaction.lock().await;

        let inspection_path = self
            .inspection_dir
            .join(format!("{}.vtt", sanitize_name(&episode.title)));
        write_text(&inspection_path, text).await?;

        let context = ReviewContext {
            series_name: episode.series().name.clone(),
            season: episode.season.number.clone(),
            episode_number: episode.number.clone(),
            title: episode.title.clone(),
            inspection_path: inspection_path.clone(),
        };
        let answer = self.prompt.ask(&context).await;

        if let Err(e) = tokio::fs::remove_file(&inspection_path).await {
            warn!(path = %inspection_path.display(), error = %e, "could not remove inspection file");
        }

        if answer? {
            info!("caption accepted by reviewer");
            Ok(Decision::Accepted { reviewed: true })
        } else {
            info!("caption rejected by reviewer");
            Ok(Decision::Rejected)
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("inspection_dir", &self.inspection_dir)
            .finish_non_exhaustive()
    }
}
