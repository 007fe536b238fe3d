//! Full-document wrappers written as the viewable artifact of each stage.

/// Minimal document around a freshly captured note body.
pub fn raw_article(title: &str, content: &str) -> String {
    [
        "<html><head>",
        &format!("<title>{title}</title>"),
        "</head><body>",
        content,
        "</body></html>",
    ]
    .join("\n")
}

/// Styled document around extracted primary content, with the title as `<h1>`.
pub fn readable_article(title: &str, content: &str, stylesheet: &str) -> String {
    [
        "<html><head>",
        &stylesheet_link(stylesheet),
        &format!("<title>{title}</title>"),
        "</head><body><article>",
        &format!("<h1 id=\"title\">{title}</h1>"),
        &format!("<div id=\"content\">{content}</div>"),
        "</article></body></html>",
    ]
    .join("\n")
}

/// Styled document around rendered Markdown. The title heading is already
/// part of the Markdown, so none is added here.
pub fn rendered_article(title: &str, content: &str, stylesheet: &str) -> String {
    [
        "<html><head>",
        &stylesheet_link(stylesheet),
        &format!("<title>{title}</title>"),
        "</head><body><article>",
        &format!("<div id=\"content\">{content}</div>"),
        "</article></body></html>",
    ]
    .join("\n")
}

fn stylesheet_link(href: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{href}\" />")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_article_layout() {
        assert_eq!(
            raw_article("T", "<div>x</div>"),
            "<html><head>\n<title>T</title>\n</head><body>\n<div>x</div>\n</body></html>"
        );
    }

    #[test]
    fn readable_article_has_title_heading() {
        let html = readable_article("T", "<p>x</p>", "s.css");
        assert!(html.contains("<link rel=\"stylesheet\" href=\"s.css\" />"));
        assert!(html.contains("<h1 id=\"title\">T</h1>"));
        assert!(html.contains("<div id=\"content\"><p>x</p></div>"));
    }

    #[test]
    fn rendered_article_has_no_title_heading() {
        let html = rendered_article("T", "<p>x</p>", "s.css");
        assert!(html.contains("<title>T</title>"));
        assert!(!html.contains("<h1"));
    }
}
