//! Shared helpers for markup-structure extraction.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static RE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());

/// Drop inline `<style>` blocks so CSS text does not leak into
/// extracted element text.
pub(crate) fn strip_style_blocks(html: &str) -> Cow<'_, str> {
    RE_STYLE.replace_all(html, "")
}

/// Concatenated text of all descendant text nodes, trimmed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the element's direct text-node children only, trimmed.
/// Used where nested elements carry secondary text (e.g. a price cell
/// with a "to negotiate" sub-label).
pub(crate) fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
        .trim()
        .to_string()
}
