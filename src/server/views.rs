// file: src/server/views.rs
// description: html rendering for the query form and answers
// reference: server-side rendered pages, markdown answers via pulldown-cmark

use crate::models::{ALL, Answer};
use crate::parser::MarkdownRenderer;
use crate::server::state::FilterOptions;
use std::fmt::Write;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem;color:#222}\
header{border-bottom:1px solid #ddd;margin-bottom:1rem}\
form{display:grid;gap:.75rem;margin-bottom:1.5rem}\
textarea{width:100%;min-height:5rem;font:inherit}\
.filters{display:flex;gap:1rem}\
.answer{background:#f7f9fc;border:1px solid #dde3ee;padding:1rem;border-radius:6px}\
.error{background:#fdecea;border:1px solid #f5c2c0;padding:1rem;border-radius:6px}\
.meta{color:#555;font-size:.9rem}\
details{margin-top:1rem}\
li.evidence{margin-bottom:.5rem}";

/// Values echoed back into the form after a submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    pub query: String,
    pub insurance_type: String,
    pub region: String,
}

pub enum Outcome<'a> {
    Empty,
    Answer(&'a Answer),
    Error(&'a str),
}

pub fn render_page(options: &FilterOptions, values: &FormValues, outcome: Outcome<'_>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    let _ = write!(html, "<title>Insurance Market Intelligence</title><style>{}</style>", STYLE);
    html.push_str("</head><body>");
    html.push_str("<header><h1>Insurance Market Intelligence</h1>");
    html.push_str("<p class=\"meta\">Ask about rates, claims trends and regulatory changes.</p></header>");

    render_form(&mut html, options, values);

    match outcome {
        Outcome::Empty => {}
        Outcome::Answer(answer) => render_answer(&mut html, answer),
        Outcome::Error(message) => {
            let _ = write!(
                html,
                "<section class=\"error\"><strong>Error:</strong> {}</section>",
                escape_html(message)
            );
        }
    }

    html.push_str("</body></html>");
    html
}

fn render_form(html: &mut String, options: &FilterOptions, values: &FormValues) {
    html.push_str("<form method=\"post\" action=\"/ask\">");
    let _ = write!(
        html,
        "<label for=\"query\">Question</label>\
         <textarea id=\"query\" name=\"query\" required \
         placeholder=\"e.g. Compare auto insurance rates in California\">{}</textarea>",
        escape_html(&values.query)
    );

    html.push_str("<div class=\"filters\">");
    render_select(html, "insurance_type", "Insurance type", &options.insurance_types, &values.insurance_type);
    render_select(html, "region", "Region", &options.regions, &values.region);
    html.push_str("</div><button type=\"submit\">Ask</button></form>");
}

fn render_select(html: &mut String, name: &str, label: &str, choices: &[String], selected: &str) {
    let selected = if selected.is_empty() { ALL } else { selected };
    let _ = write!(html, "<label>{} <select name=\"{}\">", label, name);
    for choice in choices {
        let marker = if choice.eq_ignore_ascii_case(selected) {
            " selected"
        } else {
            ""
        };
        let escaped = escape_html(choice);
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            escaped, marker, escaped
        );
    }
    html.push_str("</select></label>");
}

fn render_answer(html: &mut String, answer: &Answer) {
    let body = MarkdownRenderer::new().to_html(&answer.text);

    let _ = write!(
        html,
        "<section class=\"answer\"><h2>{}</h2>{}",
        escape_html(answer.skill.title()),
        body
    );
    let _ = write!(
        html,
        "<p class=\"meta\">Confidence: {:.0}% &middot; Answer id: {}</p>",
        answer.confidence * 100.0,
        escape_html(&answer.id)
    );

    if answer.filters_relaxed {
        html.push_str(
            "<p class=\"meta\">No records matched the selected filters; \
             the answer uses the closest unfiltered results.</p>",
        );
    }

    if !answer.evidence.is_empty() {
        let _ = write!(
            html,
            "<details><summary>Evidence ({} chunks)</summary><ol>",
            answer.evidence.len()
        );
        for evidence in &answer.evidence {
            let _ = write!(
                html,
                "<li class=\"evidence\"><code>{}</code> <span class=\"meta\">score {:.4}</span><br>{}</li>",
                escape_html(&evidence.document_id),
                evidence.score,
                escape_html(&evidence.text)
            );
        }
        html.push_str("</ol></details>");
    }

    html.push_str("</section>");
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Evidence, SkillKind};

    fn options() -> FilterOptions {
        FilterOptions::from_values(Vec::new(), Vec::new())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_form_preserves_selection() {
        let values = FormValues {
            query: "rates <now>".to_string(),
            insurance_type: "life".to_string(),
            region: "TX".to_string(),
        };
        let html = render_page(&options(), &values, Outcome::Empty);

        assert!(html.contains("rates &lt;now&gt;</textarea>"));
        assert!(html.contains("<option value=\"life\" selected>life</option>"));
        assert!(html.contains("<option value=\"TX\" selected>TX</option>"));
        assert!(html.contains("<option value=\"all\">all</option>"));
    }

    #[test]
    fn test_answer_markdown_is_rendered_and_evidence_escaped() {
        let answer = Answer {
            id: "abc".to_string(),
            query: "q".to_string(),
            skill: SkillKind::BenchmarkRates,
            text: "**Cheapest**: Geico <script>alert(1)</script>".to_string(),
            confidence: 0.9,
            evidence: vec![Evidence {
                chunk_id: "rate_summary:x#0".to_string(),
                document_id: "rate_summary:x".to_string(),
                score: 0.5,
                rank: 1,
                text: "<img src=x>".to_string(),
            }],
            filters_relaxed: true,
        };

        let html = render_page(&options(), &FormValues::default(), Outcome::Answer(&answer));
        assert!(html.contains("<strong>Cheapest</strong>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(html.contains("Confidence: 90%"));
        assert!(html.contains("closest unfiltered results"));
    }

    #[test]
    fn test_error_is_escaped() {
        let html = render_page(&options(), &FormValues::default(), Outcome::Error("<bad>"));
        assert!(html.contains("<strong>Error:</strong> &lt;bad&gt;"));
    }
}
