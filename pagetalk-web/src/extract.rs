//! URL discovery and HTML-to-sections extraction.
//!
//! Both operations are total: any input text yields a (possibly empty) URL
//! list, and any input HTML yields a (possibly empty) section list. The
//! parser runs three independent passes so section ordering is by kind
//! first, document order second.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::{ScrapedContent, Section, SectionKind};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*",
    )
    .expect("url pattern compiles")
});

static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("heading selector parses"));
static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector parses"));
static LIST_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul, ol").expect("list selector parses"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("title selector parses"));

/// Find HTTP/HTTPS URLs in free text, in order of first occurrence,
/// duplicates preserved. No normalization happens here; the cache derives
/// its own key. Text with zero matches yields an empty Vec.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse an HTML document into typed sections.
///
/// Three passes, each appending in document order: `h1`/`h2`/`h3` headings,
/// then `p` paragraphs, then `ul`/`ol` lists. Each list contributes its
/// whole text as a single section rather than one per item. `title` is the
/// first `h1`'s trimmed text, or empty. Malformed HTML never fails; a parse
/// that matches nothing is a valid empty result.
pub fn parse_sections(url: &str, html: &str) -> ScrapedContent {
    let document = Html::parse_document(html);
    let mut sections = Vec::new();

    for heading in document.select(&HEADING_SELECTOR) {
        sections.push(Section {
            kind: SectionKind::Heading,
            content: element_text(heading),
        });
    }
    for paragraph in document.select(&PARAGRAPH_SELECTOR) {
        sections.push(Section {
            kind: SectionKind::Paragraph,
            content: element_text(paragraph),
        });
    }
    for list in document.select(&LIST_SELECTOR) {
        sections.push(Section {
            kind: SectionKind::List,
            content: element_text(list),
        });
    }

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_default();

    ScrapedContent {
        url: url.to_string(),
        title,
        sections,
        cached_at: None,
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_urls_in_occurrence_order_with_duplicates() {
        let text = "see https://example.com/a then http://www.foo.org/b?q=1 \
                    and again https://example.com/a";
        let urls = extract_urls(text);
        assert_eq!(
            urls,
            vec![
                "https://example.com/a",
                "http://www.foo.org/b?q=1",
                "https://example.com/a",
            ]
        );
    }

    #[test]
    fn no_urls_yields_empty_vec() {
        assert!(extract_urls("just words, no links here").is_empty());
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn scheme_required() {
        assert!(extract_urls("www.example.com has no scheme").is_empty());
        assert!(extract_urls("ftp://example.com wrong scheme").is_empty());
    }

    #[test]
    fn captures_path_query_and_fragment() {
        let urls = extract_urls("https://a.dev/p/q?x=1&y=2#frag trailing");
        assert_eq!(urls, vec!["https://a.dev/p/q?x=1&y=2#frag"]);
    }

    #[test]
    fn sections_come_in_pass_order() {
        let html = r#"
            <html><body>
              <p>first para</p>
              <h1>Title</h1>
              <ul><li>one</li><li>two</li></ul>
              <h2>Sub</h2>
              <p>second para</p>
            </body></html>
        "#;
        let content = parse_sections("https://x.test/page", html);

        let kinds: Vec<_> = content.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Heading,
                SectionKind::Heading,
                SectionKind::Paragraph,
                SectionKind::Paragraph,
                SectionKind::List,
            ]
        );
        assert_eq!(content.sections[0].content, "Title");
        assert_eq!(content.sections[1].content, "Sub");
        assert_eq!(content.sections[2].content, "first para");
        assert_eq!(content.title, "Title");
    }

    #[test]
    fn whole_list_is_a_single_section() {
        let html = "<ul><li>alpha</li><li>beta</li><li>gamma</li></ul>";
        let content = parse_sections("https://x.test", html);
        assert_eq!(content.sections.len(), 1);
        assert_eq!(content.sections[0].kind, SectionKind::List);
        assert!(content.sections[0].content.contains("alpha"));
        assert!(content.sections[0].content.contains("gamma"));
    }

    #[test]
    fn malformed_html_does_not_panic() {
        let content = parse_sections("https://x.test", "<h1>broken <p>markup<div><ul><li>x");
        assert!(!content.sections.is_empty());
        assert!(content.title.starts_with("broken"));
    }

    #[test]
    fn zero_matches_is_a_valid_empty_result() {
        let content = parse_sections("https://x.test", "<div><span>nothing matches</span></div>");
        assert!(content.sections.is_empty());
        assert_eq!(content.title, "");
    }

    #[test]
    fn empty_elements_yield_empty_content_not_absence() {
        let content = parse_sections("https://x.test", "<p>  </p><p>kept</p>");
        assert_eq!(content.sections.len(), 2);
        assert_eq!(content.sections[0].content, "");
        assert_eq!(content.sections[1].content, "kept");
    }
}
