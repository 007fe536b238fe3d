//! Readability-style extraction of a note's primary content.
//!
//! Paragraph-like blocks score their parent (and, at half weight, their
//! grandparent) by text length and comma count; class and id hints nudge the
//! score. The best-scoring container wins and has its chrome stripped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use noteharvest_shared::{HarvestError, Result};

/// Pulls the primary-content HTML out of a full article document.
pub trait ContentExtractor: Send + Sync {
    /// Fails with [`HarvestError::Extraction`] when nothing readable is found.
    fn extract_readable(&self, article_html: &str) -> Result<String>;
}

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|main|note|page|post|story|text")
        .expect("valid regex")
});

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)banner|combx|comment|footer|header|menu|meta|nav|related|share|sidebar|social|sponsor|widget")
        .expect("valid regex")
});

/// Elements removed from the winning container.
const CHROME: &str = "nav, header, footer, aside, form, script, style, noscript, iframe, .sidebar, .nav";

/// Fallback containers, tried in order when no paragraph scores.
const FALLBACKS: [&str; 5] = ["article", "main", r#"[role="main"]"#, ".content", "body"];

/// Minimum text length for a block to count towards its ancestors.
const MIN_BLOCK_LEN: usize = 25;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

impl ContentExtractor for ReadabilityExtractor {
    #[instrument(skip_all, fields(html_len = article_html.len()))]
    fn extract_readable(&self, article_html: &str) -> Result<String> {
        let doc = Html::parse_document(article_html);

        let container = best_candidate(&doc).or_else(|| fallback_container(&doc));
        let Some(container) = container else {
            return Err(HarvestError::Extraction("document has no body".into()));
        };

        let content = strip_chrome(&container.inner_html())?;
        if visible_text(&content).is_empty() {
            return Err(HarvestError::Extraction(
                "no readable content found in the article".into(),
            ));
        }

        debug!(
            container = container.value().name(),
            content_len = content.len(),
            "readable content extracted"
        );
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Highest-scoring container; ties go to the one met first in document order.
fn best_candidate(doc: &Html) -> Option<ElementRef<'_>> {
    let blocks = parse_selector("p, pre, blockquote, div, span").ok()?;

    // node -> (first-seen order, score)
    let mut scores: HashMap<_, (usize, f64)> = HashMap::new();
    let mut credit = |el: &ElementRef, amount: f64| {
        let order = scores.len();
        scores.entry(el.id()).or_insert_with(|| (order, hint_score(el))).1 += amount;
    };

    for block in doc.select(&blocks) {
        if !is_leaf_block(&block) {
            continue;
        }
        let text = block.text().collect::<String>();
        let text = text.trim();
        if text.chars().count() < MIN_BLOCK_LEN {
            continue;
        }

        let score = 1.0 + text.matches(',').count() as f64 + (text.len() / 100).min(3) as f64;

        if let Some(parent) = block.parent().and_then(ElementRef::wrap) {
            credit(&parent, score);
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                credit(&grandparent, score / 2.0);
            }
        }
    }

    scores
        .into_iter()
        .filter(|(_, (_, score))| *score > 0.0)
        .max_by(|(_, (order_a, a)), (_, (order_b, b))| {
            a.total_cmp(b).then_with(|| order_b.cmp(order_a))
        })
        .and_then(|(id, _)| doc.tree.get(id))
        .and_then(ElementRef::wrap)
}

/// A block whose children are all inline, i.e. a paragraph in practice.
fn is_leaf_block(el: &ElementRef) -> bool {
    match el.value().name() {
        "p" | "pre" | "blockquote" => true,
        "div" | "span" => !el.children().filter_map(ElementRef::wrap).any(|child| {
            matches!(
                child.value().name(),
                "div" | "p" | "section" | "article" | "table" | "ul" | "ol" | "pre"
                    | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            )
        }),
        _ => false,
    }
}

/// Starting score from the element's class and id.
fn hint_score(el: &ElementRef) -> f64 {
    let hints = [el.value().attr("class"), el.value().attr("id")];
    let mut score = match el.value().name() {
        "article" | "main" => 5.0,
        "div" | "section" => 1.0,
        "form" | "nav" | "aside" | "footer" | "header" => -5.0,
        _ => 0.0,
    };
    for hint in hints.into_iter().flatten() {
        if NEGATIVE_RE.is_match(hint) {
            score -= 25.0;
        }
        if POSITIVE_RE.is_match(hint) {
            score += 25.0;
        }
    }
    score
}

fn fallback_container(doc: &Html) -> Option<ElementRef<'_>> {
    FALLBACKS.iter().find_map(|sel| {
        let selector = parse_selector(sel).ok()?;
        doc.select(&selector).next()
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip common navigation/chrome elements from HTML content.
fn strip_chrome(html: &str) -> Result<String> {
    let doc = Html::parse_fragment(html);
    let chrome = parse_selector(CHROME)?;

    let mut result = html.to_string();
    for el in doc.select(&chrome) {
        result = result.replace(&el.html(), "");
    }
    Ok(result)
}

fn visible_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| HarvestError::Extraction(format!("invalid selector '{selector}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
                         eiusmod tempor incididunt ut labore et dolore magna aliqua.";

    #[test]
    fn picks_the_paragraph_container() {
        let html = format!(
            r#"<html><body>
            <div class="sidebar"><p>Friends, groups, pages, and more things here.</p></div>
            <div class="note-body"><p>{LOREM}</p><p>{LOREM}</p><p>{LOREM}</p></div>
            <div class="footer">Privacy, Terms, Cookies, Advertising</div>
            </body></html>"#
        );

        let content = ReadabilityExtractor.extract_readable(&html).unwrap();
        assert!(content.contains("Lorem ipsum"));
        assert!(!content.contains("Friends, groups"));
        assert!(!content.contains("Privacy, Terms"));
    }

    #[test]
    fn scores_leaf_divs_like_paragraphs() {
        let html = format!(
            r#"<html><body><div data-pagelet="page">
            <h2><span>Title</span></h2>
            <div class="body"><div>{LOREM}</div><div>{LOREM}</div></div>
            </div></body></html>"#
        );

        let content = ReadabilityExtractor.extract_readable(&html).unwrap();
        assert!(content.contains("consectetur adipiscing"));
    }

    #[test]
    fn equal_scores_keep_the_first_container() {
        let html = format!(
            r#"<html><body>
            <div id="x"><p>ALPHA {LOREM}</p></div>
            <div id="y"><p>BETA_ {LOREM}</p></div>
            </body></html>"#
        );

        for _ in 0..50 {
            let content = ReadabilityExtractor.extract_readable(&html).unwrap();
            assert!(content.contains("ALPHA"), "{content}");
            assert!(!content.contains("BETA_"), "{content}");
        }
    }

    #[test]
    fn strips_scripts_from_the_winner() {
        let html = format!(
            "<html><body><article><p>{LOREM}</p><script>track()</script></article></body></html>"
        );
        let content = ReadabilityExtractor.extract_readable(&html).unwrap();
        assert!(!content.contains("track()"));
        assert!(content.contains("Lorem ipsum"));
    }

    #[test]
    fn short_content_falls_back_to_body() {
        let html = "<html><body><h2>Hi</h2><p>Short.</p></body></html>";
        let content = ReadabilityExtractor.extract_readable(html).unwrap();
        assert!(content.contains("Short."));
    }

    #[test]
    fn empty_document_is_an_error() {
        let err = ReadabilityExtractor
            .extract_readable("<html><body><script>x()</script></body></html>")
            .unwrap_err();
        assert!(matches!(err, HarvestError::Extraction(_)));
    }
}
