//! In-page JavaScript evaluated through CDP.
//!
//! Selectors and phrases come from configuration, so they are embedded as JSON
//! string literals rather than spliced in raw.

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// `true` once an element matching `selector` is present.
pub(crate) fn selector_present(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

/// The `aria-label` of the identity element, or `"anonymous"`.
pub(crate) fn identity(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.body.querySelector({}); \
         return (el && el.getAttribute('aria-label')) || 'anonymous'; }})()",
        js_string(selector)
    )
}

/// Scroll to the bottom, then return the `href` of every matching link.
pub(crate) fn scroll_and_collect(link_selector: &str) -> String {
    format!(
        "(() => {{ window.scrollTo(0, document.body.scrollHeight); \
         return Array.from(document.querySelectorAll({}), el => el.getAttribute('href')) \
         .filter(href => href); }})()",
        js_string(link_selector)
    )
}

/// Capture a note's container and title, or report whether the page shows
/// the rate-limit phrase.
pub(crate) fn capture_note(article_selector: &str, title_selector: &str, phrase: &str) -> String {
    format!(
        "(() => {{ \
           const article = document.querySelector({article}); \
           const title = article && article.querySelector({title}); \
           if (!article || !title) {{ \
             return {{ found: false, rateLimited: document.body.innerHTML.includes({phrase}) }}; \
           }} \
           return {{ found: true, title: title.innerHTML, content: article.outerHTML }}; \
         }})()",
        article = js_string(article_selector),
        title = js_string(title_selector),
        phrase = js_string(phrase),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted() {
        let js = selector_present(r#"[href="/me/"][aria-label]"#);
        assert_eq!(
            js,
            r#"document.querySelector("[href=\"/me/\"][aria-label]") !== null"#
        );
    }

    #[test]
    fn capture_embeds_all_inputs() {
        let js = capture_note("[data-pagelet=\"page\"]", "h2 > span", "We limit how often");
        assert!(js.contains(r#""[data-pagelet=\"page\"]""#));
        assert!(js.contains(r#""h2 > span""#));
        assert!(js.contains(r#""We limit how often""#));
        assert!(js.contains("rateLimited"));
    }

    #[test]
    fn collect_scrolls_before_querying() {
        let js = scroll_and_collect("a.note");
        let scroll = js.find("scrollTo").unwrap();
        let query = js.find("querySelectorAll").unwrap();
        assert!(scroll < query);
    }
}
