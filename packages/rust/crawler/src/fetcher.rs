//! Raw capture of a single note.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

use noteharvest_markdown::raw_article;
use noteharvest_shared::{HarvestError, Meta, RawContent, Result};

use crate::script;
use crate::session::{BrowserSession, SessionProvider, close_page, evaluate};

/// Fetches the raw representation of a note from the source.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_raw(&self, meta: &Meta) -> Result<RawContent>;
}

/// What the capture script found on the note page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Capture {
    found: bool,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    rate_limited: bool,
}

impl Capture {
    fn into_raw(self, id: &str) -> Result<RawContent> {
        match (self.found, self.title, self.content) {
            (true, Some(title), Some(content)) => {
                let article = raw_article(&title, &content);
                Ok(RawContent {
                    title,
                    content,
                    article,
                })
            }
            _ => Err(capture_failure(id, self.rate_limited)),
        }
    }
}

/// Error for a page that did not contain the note.
///
/// The source serves an interstitial instead of the note when throttling, and
/// sometimes serves one without the recognizable phrase.
fn capture_failure(id: &str, rate_limited: bool) -> HarvestError {
    let message = if rate_limited {
        "the source has rate limited this account; try again in a few hours"
    } else {
        "the note content was missing from the page, probably because the source \
         has rate limited this account; try again in a few hours"
    };
    HarvestError::Fetch {
        id: id.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl SourceFetcher for BrowserSession {
    #[instrument(skip_all, fields(id = %meta.id))]
    async fn fetch_raw(&self, meta: &Meta) -> Result<RawContent> {
        self.login().await?;
        info!("fetching note content");

        let profile = self.profile();
        let js = script::capture_note(
            &profile.article_selector,
            &profile.title_selector,
            &profile.rate_limit_phrase,
        );

        let page = self.open_page(&meta.url).await?;
        let capture = evaluate::<Capture>(&page, &js).await;
        close_page(page).await;

        capture?.into_raw(&meta.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(json: &str) -> Capture {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn found_capture_builds_raw_article() {
        let raw = capture(r#"{"found": true, "title": "Hi", "content": "<div>body</div>"}"#)
            .into_raw("1")
            .unwrap();
        assert_eq!(raw.title, "Hi");
        assert_eq!(raw.content, "<div>body</div>");
        assert_eq!(
            raw.article,
            "<html><head>\n<title>Hi</title>\n</head><body>\n<div>body</div>\n</body></html>"
        );
    }

    #[test]
    fn rate_limit_phrase_is_reported() {
        let err = capture(r#"{"found": false, "rateLimited": true}"#)
            .into_raw("42")
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("42"));
        assert!(text.contains("rate limited"));
        assert!(!text.contains("probably"));
    }

    #[test]
    fn missing_content_is_probably_rate_limiting() {
        let err = capture(r#"{"found": false, "rateLimited": false}"#)
            .into_raw("42")
            .unwrap_err();
        assert!(matches!(err, HarvestError::Fetch { ref id, .. } if id == "42"));
        assert!(err.to_string().contains("probably"));
    }
}
