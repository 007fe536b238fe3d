//! Post-conversion passes over the Markdown text.
//!
//! Each pass is a function `&str -> String` applied in sequence, like the
//! cleanup pipeline it replaces.

use std::sync::LazyLock;

use regex::Regex;

/// Substring marking the underline of a setext level-1 heading.
const DIVIDER_PATTERN: &str = "====";

/// Substring of the "public" audience badge the source renders above a note.
const PUBLIC_MARKER: &str = "![Public](";

/// Rewrite ATX level-1 headings (`# Title`) as setext headings
/// (`Title` over a line of `=` as long as the title).
///
/// Fenced code blocks are left untouched.
pub(crate) fn setext_h1(md: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex"));

    let mut lines: Vec<String> = Vec::new();
    let mut in_code_block = false;

    for line in md.split('\n') {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            lines.push(line.to_string());
            continue;
        }

        match H1_RE.captures(line) {
            Some(caps) if !in_code_block => {
                let text = &caps[1];
                lines.push(text.to_string());
                lines.push(underline(text));
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines.join("\n")
}

/// Strip the navigation chrome that precedes a note's actual content.
///
/// Scans for the first line containing the divider pattern (the title
/// underline) and remembers the line after it; a line containing the public
/// marker overrides that and ends the scan. Everything before the chosen line
/// is dropped. When a boundary was found, a setext title heading is prepended.
pub fn trim_boilerplate(converted: &str, title: &str) -> String {
    let lines: Vec<&str> = converted.split('\n').collect();

    let mut divider = 0;
    for (i, line) in lines.iter().enumerate() {
        if divider == 0 && line.contains(DIVIDER_PATTERN) {
            divider = i + 1;
        }
        if line.contains(PUBLIC_MARKER) {
            divider = i + 1;
            break;
        }
    }

    let body = lines[divider..].join("\n");
    if divider == 0 {
        return body;
    }

    format!("{title}\n{}\n{body}", underline(title))
}

/// One `=` per UTF-16 code unit, so astral characters such as emoji take two.
fn underline(text: &str) -> String {
    "=".repeat(text.encode_utf16().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_case() {
        let converted = ["A", "====", "B", "C"].join("\n");
        assert_eq!(trim_boilerplate(&converted, "A"), "A\n=\nB\nC");
    }

    #[test]
    fn public_marker_takes_priority() {
        let converted = [
            "nav",
            "====",
            "chrome",
            "more chrome",
            "![Public](https://static.example.com/public.png)",
            "Body line",
        ]
        .join("\n");

        let out = trim_boilerplate(&converted, "My Note");
        assert_eq!(out, "My Note\n=======\nBody line");
    }

    #[test]
    fn scanning_stops_at_public_marker() {
        let converted = ["x", "![Public](p.png)", "Body", "====", "after"].join("\n");
        let out = trim_boilerplate(&converted, "T");
        assert_eq!(out, "T\n=\nBody\n====\nafter");
    }

    #[test]
    fn only_first_divider_counts() {
        let converted = ["Title", "=====", "one", "=====", "two"].join("\n");
        let out = trim_boilerplate(&converted, "Title");
        assert_eq!(out, "Title\n=====\none\n=====\ntwo");
    }

    #[test]
    fn no_marker_keeps_input_verbatim() {
        let converted = "Just text\n\n* a list\n";
        assert_eq!(trim_boilerplate(converted, "Ignored"), converted);
    }

    #[test]
    fn underline_counts_characters_not_bytes() {
        let out = trim_boilerplate("x\n====\nbody", "Café");
        assert_eq!(out, "Café\n====\nbody");
    }

    #[test]
    fn underline_counts_emoji_as_two_units() {
        let out = trim_boilerplate("x\n====\nbody", "Hi 🎉");
        assert_eq!(out, "Hi 🎉\n=====\nbody");
    }

    #[test]
    fn setext_rewrites_atx_h1() {
        let md = "# Hello World\n\nText\n\n## Sub";
        assert_eq!(
            setext_h1(md),
            "Hello World\n===========\n\nText\n\n## Sub"
        );
    }

    #[test]
    fn setext_skips_code_blocks() {
        let md = "```sh\n# not a heading\n```";
        assert_eq!(setext_h1(md), md);
    }
}
