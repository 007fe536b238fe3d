//! Per-note pipeline: raw → readable → markdown → rendered, each memoized.

use async_trait::async_trait;
use tracing::instrument;

use noteharvest_crawler::{ContentExtractor, SourceFetcher};
use noteharvest_markdown::{note_markdown, readable_article, render_html, rendered_article};
use noteharvest_shared::{
    Markdown, MarkdownNote, Meta, Note, Raw, RawNote, Readable, ReadableNote, Rendered,
    RenderedNote, Result,
};
use noteharvest_storage::CacheStore;

use crate::stage::{CacheStats, Memoized, Transform};

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Meta → raw capture from the source.
pub struct FetchRaw<'a> {
    fetcher: &'a dyn SourceFetcher,
}

#[async_trait]
impl<'a> Transform for FetchRaw<'a> {
    type Input = Meta;
    type Output = Raw;

    async fn apply(&self, meta: &Meta) -> Result<RawNote> {
        let raw = self.fetcher.fetch_raw(meta).await?;
        Ok(Note::new(meta.clone(), raw.title, raw.content, raw.article))
    }
}

/// Raw article → primary content, wrapped in a styled document.
pub struct ExtractReadable<'a> {
    extractor: &'a dyn ContentExtractor,
    stylesheet: String,
}

#[async_trait]
impl<'a> Transform for ExtractReadable<'a> {
    type Input = RawNote;
    type Output = Readable;

    async fn apply(&self, raw: &RawNote) -> Result<ReadableNote> {
        let content = self.extractor.extract_readable(&raw.article)?;
        let article = readable_article(&raw.title, &content, &self.stylesheet);
        Ok(Note::new(raw.meta.clone(), raw.title.clone(), content, article))
    }
}

/// Readable article → trimmed Markdown.
pub struct ConvertMarkdown;

#[async_trait]
impl Transform for ConvertMarkdown {
    type Input = ReadableNote;
    type Output = Markdown;

    async fn apply(&self, readable: &ReadableNote) -> Result<MarkdownNote> {
        let markdown = note_markdown(&readable.article, &readable.title)?;
        Ok(Note::new(
            readable.meta.clone(),
            readable.title.clone(),
            markdown.clone(),
            markdown,
        ))
    }
}

/// Markdown → HTML, wrapped in a styled document.
pub struct RenderHtml {
    stylesheet: String,
}

#[async_trait]
impl Transform for RenderHtml {
    type Input = MarkdownNote;
    type Output = Rendered;

    async fn apply(&self, markdown: &MarkdownNote) -> Result<RenderedNote> {
        let content = render_html(&markdown.content);
        let article = rendered_article(&markdown.title, &content, &self.stylesheet);
        Ok(Note::new(
            markdown.meta.clone(),
            markdown.title.clone(),
            content,
            article,
        ))
    }
}

// ---------------------------------------------------------------------------
// DocumentPipeline
// ---------------------------------------------------------------------------

/// The four memoized stages chained in fixed order.
pub struct DocumentPipeline<'a> {
    raw: Memoized<FetchRaw<'a>>,
    readable: Memoized<ExtractReadable<'a>>,
    markdown: Memoized<ConvertMarkdown>,
    rendered: Memoized<RenderHtml>,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(
        cache: &CacheStore,
        fetcher: &'a dyn SourceFetcher,
        extractor: &'a dyn ContentExtractor,
        stylesheet: &str,
    ) -> Self {
        Self {
            raw: Memoized::new(FetchRaw { fetcher }, cache.clone()),
            readable: Memoized::new(
                ExtractReadable {
                    extractor,
                    stylesheet: stylesheet.to_string(),
                },
                cache.clone(),
            ),
            markdown: Memoized::new(ConvertMarkdown, cache.clone()),
            rendered: Memoized::new(
                RenderHtml {
                    stylesheet: stylesheet.to_string(),
                },
                cache.clone(),
            ),
        }
    }

    /// Run one note through every stage, stopping at the first failure.
    #[instrument(skip_all, fields(id = %meta.id))]
    pub async fn run(&self, meta: &Meta) -> Result<RenderedNote> {
        let raw = self.raw.run(meta).await?;
        let readable = self.readable.run(&raw).await?;
        let markdown = self.markdown.run(&readable).await?;
        self.rendered.run(&markdown).await
    }

    /// Hits and misses summed over all four stages.
    pub fn stats(&self) -> CacheStats {
        self.raw.stats() + self.readable.stats() + self.markdown.stats() + self.rendered.stats()
    }
}
