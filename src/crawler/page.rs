//! Readable-text extraction from fetched pages.

use scraper::{ElementRef, Html, Selector};

const TEXT_SELECTOR: &str = "h1, h2, h3, p, li, pre";
const TEXT_TAGS: [&str; 6] = ["h1", "h2", "h3", "p", "li", "pre"];
const SKIPPED_TAGS: [&str; 7] = ["script", "style", "noscript", "nav", "header", "footer", "aside"];

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
}

/// Title plus the text of headings, paragraphs, list items and `pre` blocks,
/// whitespace-collapsed and cut to `max_chars` characters.
pub fn extract_html(html: &str, max_chars: usize) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        })
        .filter(|title| !title.is_empty());

    let mut blocks: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse(TEXT_SELECTOR) {
        for element in document.select(&selector) {
            if has_excluded_ancestor(&element) {
                continue;
            }
            let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }

    ExtractedPage {
        title,
        text: truncate_chars(&blocks.join("\n"), max_chars),
    }
}

pub fn extract_plain(body: &str, max_chars: usize) -> ExtractedPage {
    ExtractedPage {
        title: None,
        text: truncate_chars(&collapse_whitespace(body), max_chars),
    }
}

// Nested text elements are covered by their outermost match.
fn has_excluded_ancestor(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        node.value().as_element().is_some_and(|el| {
            let name = el.name();
            SKIPPED_TAGS.contains(&name) || TEXT_TAGS.contains(&name)
        })
    })
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
