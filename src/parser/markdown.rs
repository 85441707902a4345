// file: src/parser/markdown.rs
// description: renders model answers written in markdown for the web and terminal
// reference: https://docs.rs/pulldown-cmark

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

const SAFE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Relative destinations pass; absolute ones need a scheme in `SAFE_SCHEMES`.
fn is_safe_link(dest: &str) -> bool {
    let dest: String = dest
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();

    match dest.split_once(':') {
        Some((scheme, _)) if !scheme.contains(['/', '?', '#']) => SAFE_SCHEMES
            .iter()
            .any(|safe| scheme.eq_ignore_ascii_case(safe)),
        _ => true,
    }
}

pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }

    /// Raw HTML in the source is emitted as escaped text, never as markup.
    /// Links with an unsafe scheme keep their text but lose the anchor.
    pub fn to_html(&self, content: &str) -> String {
        let mut in_dropped_link = false;
        let parser = Parser::new_ext(content, self.options).filter_map(move |event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
            Event::Start(Tag::Link { ref dest_url, .. }) if !is_safe_link(dest_url) => {
                in_dropped_link = true;
                None
            }
            Event::End(TagEnd::Link) if in_dropped_link => {
                in_dropped_link = false;
                None
            }
            other => Some(other),
        });

        let mut output = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }

    pub fn to_plain_text(&self, content: &str) -> String {
        let mut plain_text = String::new();
        let mut list_depth = 0usize;

        for event in Parser::new_ext(content, self.options) {
            match event {
                Event::Start(Tag::List(_)) => list_depth += 1,
                Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
                Event::Start(Tag::Item) => {
                    plain_text.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                    plain_text.push_str("- ");
                }
                Event::End(TagEnd::Item)
                | Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::CodeBlock) => {
                    if !plain_text.ends_with('\n') {
                        plain_text.push('\n');
                    }
                }
                Event::Text(text) | Event::Code(text) | Event::Html(text) | Event::InlineHtml(text) => {
                    plain_text.push_str(&text);
                }
                Event::SoftBreak => plain_text.push(' '),
                Event::HardBreak => plain_text.push('\n'),
                _ => {}
            }
        }

        plain_text.trim().to_string()
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_rendering() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.to_html("## Benchmark\n\n**Geico** is cheapest.");

        assert!(html.contains("<h2>Benchmark</h2>"));
        assert!(html.contains("<strong>Geico</strong>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.to_html("Rates <script>alert(1)</script> rising");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unsafe_links_lose_their_anchor() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.to_html("See [filing](javascript:alert(1)) and <JavaScript:void(0)>.");

        assert!(!html.to_lowercase().contains("javascript:alert"));
        assert!(!html.contains("<a"));
        assert!(html.contains("filing"));
    }

    #[test]
    fn test_safe_links_are_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.to_html("[NAIC](https://naic.org) or [mail](mailto:a@b.com) or [rates](/rates)");

        assert!(html.contains("<a href=\"https://naic.org\">NAIC</a>"));
        assert!(html.contains("<a href=\"mailto:a@b.com\">mail</a>"));
        assert!(html.contains("<a href=\"/rates\">rates</a>"));
    }

    #[test]
    fn test_plain_text_lists() {
        let renderer = MarkdownRenderer::new();
        let text = renderer.to_plain_text("# Summary\n\n- lower deductible\n- bundle policies");

        assert_eq!(text, "Summary\n- lower deductible\n- bundle policies");
    }
}
