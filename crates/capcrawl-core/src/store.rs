//! Caption URL derivation and on-disk storage
//!
//! Accepted captions land under `<root>/<dir>/<dir> - <episode>.vtt`, where
//! `<dir>` is the sanitized series name, suffixed with ` S<season>` for every
//! season but the first.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, info};

use crate::error::{CrawlError, Result};
use crate::types::Episode;

/// Default caption CDN prefix
pub const DEFAULT_CAPTION_PREFIX: &str = "https://assetshuluimcom-a.akamaihd.net/captions_webvtt/";

/// Default caption file suffix
pub const DEFAULT_CAPTION_SUFFIX: &str = "_US_en_en.vtt";

/// Extension of stored captions
const CAPTION_EXTENSION: &str = "vtt";

/// Characters that are not allowed in file and directory names
fn forbidden_chars() -> &'static Regex {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    FORBIDDEN.get_or_init(|| Regex::new(r#"[?*/\\|:><"]"#).expect("valid character class"))
}

/// Replace every character that is unsafe in a path component with `_`.
///
/// # Examples
/// ```
/// use capcrawl_core::store::sanitize_name;
///
/// assert_eq!(sanitize_name("Re:Zero"), "Re_Zero");
/// assert_eq!(sanitize_name("What? Why*"), "What_ Why_");
/// ```
pub fn sanitize_name(name: &str) -> String {
    forbidden_chars().replace_all(name, "_").into_owned()
}

/// Directory name for a season of `series_name`.
///
/// Season `"1"` uses the bare sanitized name; any other season appends
/// ` S<season>`.
pub fn season_dir_name(series_name: &str, season: &str) -> String {
    let name = sanitize_name(series_name);
    if season == "1" {
        name
    } else {
        format!("{name} S{season}")
    }
}

/// Location of the caption CDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionHost {
    /// URL prefix, ending with `/`
    pub prefix: String,
    /// Appended after the content id
    pub suffix: String,
}

impl Default for CaptionHost {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_CAPTION_PREFIX.to_string(),
            suffix: DEFAULT_CAPTION_SUFFIX.to_string(),
        }
    }
}

impl CaptionHost {
    /// Build the caption URL for `content_id`.
    ///
    /// The CDN shards captions by the number formed from the last three
    /// characters of the id: `<prefix><n>/<content_id><suffix>`.
    ///
    /// # Errors
    /// Returns `CrawlError::Parse` if those characters end without a digit.
    ///
    /// # Examples
    /// ```
    /// use capcrawl_core::store::CaptionHost;
    ///
    /// let host = CaptionHost::default();
    /// let url = host.caption_url("60245007").unwrap();
    /// assert!(url.ends_with("/7/60245007_US_en_en.vtt"));
    /// ```
    pub fn caption_url(&self, content_id: &str) -> Result<String> {
        let shard = caption_shard(content_id).ok_or_else(|| {
            CrawlError::Parse(format!("content id has no numeric tail: {content_id:?}"))
        })?;
        Ok(format!(
            "{}{}/{}{}",
            self.prefix, shard, content_id, self.suffix
        ))
    }
}

/// Numeric shard of a content id, leading zeros stripped.
fn caption_shard(content_id: &str) -> Option<u64> {
    let start = content_id
        .char_indices()
        .rev()
        .nth(2)
        .map_or(0, |(i, _)| i);
    let tail = &content_id[start..];

    let digits_from = tail
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    tail[digits_from..].parse().ok()
}

/// Writes accepted captions below a root directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Destination of the caption for `episode`.
    pub fn caption_path(&self, episode: &Episode) -> PathBuf {
        let dir = season_dir_name(&episode.series().name, &episode.season.number);
        let file = format!("{dir} - {}.{CAPTION_EXTENSION}", episode.number);
        self.root.join(dir).join(file)
    }

    /// Write `text` as the caption of `episode`, replacing any previous file.
    ///
    /// # Errors
    /// Returns `CrawlError::Io` if the directory or file cannot be written
    pub async fn save(&self, episode: &Episode, text: &str) -> Result<PathBuf> {
        let path = self.caption_path(episode);
        write_text(&path, text).await?;
        info!(path = %path.display(), "caption saved");
        Ok(path)
    }
}

/// Write a whole UTF-8 file, creating parent directories as needed.
pub(crate) async fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CrawlError::io(parent, e))?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| CrawlError::io(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "file written");
    Ok(())
}
