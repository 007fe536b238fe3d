//! HTML-to-Markdown conversion, boilerplate trimming, and Markdown rendering.
//!
//! The markdown stage converts a readable article with `htmd`, turns its
//! title heading into a setext heading, and cuts the source's chrome off the
//! top ([`trim_boilerplate`]). The rendered stage goes the other way with
//! `pulldown-cmark`.

mod article;
mod trim;

use pulldown_cmark::{Options, Parser};
use scraper::Html;
use tracing::{debug, instrument};

use noteharvest_shared::{HarvestError, Result};

pub use article::{raw_article, readable_article, rendered_article};
pub use trim::trim_boilerplate;

// ---------------------------------------------------------------------------
// HTML → Markdown
// ---------------------------------------------------------------------------

/// Convert an HTML document or fragment to Markdown.
///
/// Level-1 headings come out in setext form (`Title` over `=====`).
#[instrument(skip_all, fields(html_len = html.len()))]
pub fn to_markdown(html: &str) -> Result<String> {
    let html = preprocess_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["head", "script", "style", "iframe", "noscript", "svg"])
        .build();

    let raw_markdown = converter
        .convert(&html)
        .map_err(|e| HarvestError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    Ok(trim::setext_h1(&raw_markdown))
}

/// Markdown body of a note: the converted article with leading chrome removed.
pub fn note_markdown(article_html: &str, title: &str) -> Result<String> {
    let converted = to_markdown(article_html)?;
    Ok(trim_boilerplate(&converted, title))
}

// ---------------------------------------------------------------------------
// Markdown → HTML
// ---------------------------------------------------------------------------

/// Render Markdown to an HTML fragment.
///
/// Tables and strikethrough are enabled on top of CommonMark, since the
/// converter emits both.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert HTML `<table>` elements to markdown table syntax before htmd conversion.
///
/// `htmd` 0.1 doesn't support table conversion, so we handle it manually.
fn preprocess_tables(html: &str) -> String {
    let Ok(table_sel) = scraper::Selector::parse("table") else {
        return html.to_string();
    };

    let doc = Html::parse_fragment(html);
    if doc.select(&table_sel).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table_el in doc.select(&table_sel) {
        let md_table = html_table_to_markdown(&table_el);
        result = result.replacen(&table_el.html(), &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a markdown table string.
fn html_table_to_markdown(table: &scraper::ElementRef) -> String {
    let (Ok(tr_sel), Ok(cell_sel)) = (
        scraper::Selector::parse("tr"),
        scraper::Selector::parse("th, td"),
    ) else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = table
        .select(&tr_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    for row in &mut rows {
        row.resize(col_count, String::new());
    }

    let mut md = String::from("\n\n");
    let mut push_row = |cells: &[String]| {
        md.push_str("| ");
        md.push_str(&cells.join(" | "));
        md.push_str(" |\n");
    };

    // First row doubles as the header, like most renderers expect.
    push_row(&rows[0]);
    push_row(&vec!["---".to_string(); col_count]);
    for row in &rows[1..] {
        push_row(row);
    }

    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
