//! Core domain types: note identifiers, per-stage notes, and the listing record.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the four-step content pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Raw,
    Readable,
    Markdown,
    Rendered,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [Stage::Raw, Stage::Readable, Stage::Markdown, Stage::Rendered];

    /// Directory name under `notes/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Readable => "readable",
            Self::Markdown => "markdown",
            Self::Rendered => "rendered",
        }
    }

    /// Extension of the human-viewable artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Raw | Self::Readable | Self::Rendered => "html",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-sized marker tying a [`Note`] to the stage that produced it.
pub trait StageKind: Send + Sync + 'static {
    const STAGE: Stage;
}

/// Marker for notes captured straight from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw;

/// Marker for notes reduced to their primary content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readable;

/// Marker for notes converted to Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markdown;

/// Marker for notes rendered back to styled HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendered;

impl StageKind for Raw {
    const STAGE: Stage = Stage::Raw;
}
impl StageKind for Readable {
    const STAGE: Stage = Stage::Readable;
}
impl StageKind for Markdown {
    const STAGE: Stage = Stage::Markdown;
}
impl StageKind for Rendered {
    const STAGE: Stage = Stage::Rendered;
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

/// Identifier of a single note, derived from its listing URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meta {
    /// Absolute URL of the note page.
    pub url: String,
    /// Human-readable slug segment.
    pub slug: String,
    /// Stable identifier; the cache key for every stage.
    pub id: String,
}

impl Meta {
    /// Derive a `Meta` from a listing URL.
    ///
    /// The URL is split on `/` and the last three segments are taken: the
    /// first is the slug, the second the id. Listing URLs end with a slash,
    /// so the third segment is normally empty.
    pub fn from_url(url: &str) -> Result<Self> {
        let segments: Vec<&str> = url.split('/').collect();
        if segments.len() < 3 {
            return Err(HarvestError::validation(format!(
                "listing url has too few path segments: {url}"
            )));
        }
        let tail = &segments[segments.len() - 3..];
        let (slug, id) = (tail[0], tail[1]);

        if id.is_empty() {
            return Err(HarvestError::validation(format!(
                "listing url does not contain a note id: {url}"
            )));
        }

        Ok(Self {
            url: url.to_string(),
            slug: slug.to_string(),
            id: id.to_string(),
        })
    }

    /// Derive metas for a whole listing, in order.
    ///
    /// Fails on an empty listing or when two urls share an id.
    pub fn from_urls(urls: &[String]) -> Result<Vec<Self>> {
        if urls.is_empty() {
            return Err(HarvestError::validation("listing did not contain any urls"));
        }

        let mut seen = HashSet::new();
        let mut metas = Vec::with_capacity(urls.len());
        for url in urls {
            let meta = Self::from_url(url)?;
            if !seen.insert(meta.id.clone()) {
                return Err(HarvestError::validation(format!(
                    "note id {} appears more than once in the listing",
                    meta.id
                )));
            }
            metas.push(meta);
        }
        Ok(metas)
    }
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A note as produced by stage `S`.
///
/// `content` is the stage's semantic payload; `article` is the full-document
/// form written as the viewable artifact and fed to the next stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Note<S: StageKind> {
    #[serde(flatten)]
    pub meta: Meta,
    pub title: String,
    pub content: String,
    pub article: String,
    #[serde(skip)]
    stage: PhantomData<S>,
}

impl<S: StageKind> Note<S> {
    /// Build a note for stage `S`.
    pub fn new(
        meta: Meta,
        title: impl Into<String>,
        content: impl Into<String>,
        article: impl Into<String>,
    ) -> Self {
        Self {
            meta,
            title: title.into(),
            content: content.into(),
            article: article.into(),
            stage: PhantomData,
        }
    }

    /// The note's cache key.
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// The stage this note belongs to.
    pub fn stage(&self) -> Stage {
        S::STAGE
    }
}

pub type RawNote = Note<Raw>;
pub type ReadableNote = Note<Readable>;
pub type MarkdownNote = Note<Markdown>;
pub type RenderedNote = Note<Rendered>;

/// Title and body captured from a note page by the source fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContent {
    pub title: String,
    /// Outer HTML of the article container.
    pub content: String,
    /// `content` wrapped in a minimal HTML document.
    pub article: String,
}

// ---------------------------------------------------------------------------
// Listing record
// ---------------------------------------------------------------------------

/// Root structure of `notes/database.json`.
///
/// A freshly reset workspace holds `{}`; `urls` is filled once the listing
/// has been discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<DateTime<Utc>>,
}

impl ListingRecord {
    /// A record for a freshly discovered listing.
    pub fn discovered(urls: Vec<String>) -> Self {
        Self {
            urls: Some(urls),
            discovered_at: Some(Utc::now()),
        }
    }

    /// Cached urls, if a non-empty listing was recorded.
    pub fn cached_urls(&self) -> Option<&[String]> {
        self.urls.as_deref().filter(|urls| !urls.is_empty())
    }
}
