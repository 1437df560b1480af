//! Shared helpers for saved web pages

use scraper::{ElementRef, Html, Selector};

use crate::error::Error;

/// Parse a saved page. HTML parsing is lossy and never fails.
pub(crate) fn document(content: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(content))
}

/// Compile a CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|e| Error::parse(format!("selector {css:?}"), format!("{e:?}")))
}

/// Text content of one element, trimmed
pub(crate) fn text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Concatenated text of every descendant matching `sel`, trimmed
pub(crate) fn select_text(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel)
        .flat_map(|m| m.text())
        .collect::<String>()
        .trim()
        .to_string()
}
