//! Plain-text extraction from fetched result pages

use scraper::{Html, Selector};
use std::sync::LazyLock;

static CONTENT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title, h1, h2, h3, h4, h5, h6, p, a").expect("valid content selector")
});

/// Text of every title, heading, paragraph and link, in document order
///
/// Links are followed by a space, every other element by a newline. Nested
/// matches (a link inside a paragraph) appear once for each element.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut content = String::new();

    for element in document.select(&CONTENT) {
        let text: String = element.text().collect();
        content.push_str(text.trim());
        content.push(if element.value().name() == "a" { ' ' } else { '\n' });
    }

    content
}
