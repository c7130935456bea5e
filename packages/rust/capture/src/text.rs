//! Rendered-text extraction from registry pages.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "head"];

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static INLINE_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Text a reader would see on the page, one text run per line.
pub fn visible_text(doc: &Html) -> String {
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut lines: Vec<String> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let line = INLINE_WS.replace_all(text.trim(), " ");
        if !line.is_empty() {
            lines.push(line.into_owned());
        }
    }

    lines.join("\n")
}

/// Contents of the `<title>` element, trimmed.
pub fn page_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}
