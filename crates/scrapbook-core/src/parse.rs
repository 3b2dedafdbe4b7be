//! Classification of free-form input text into text and link items.
//!
//! Parsing never fails: any input yields a (possibly empty) ordered sequence.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::id::{IdSource, RandomIds};
use crate::types::ContentItem;

/// `http(s)://`, optional `www.`, a dotted host ending in a 1-6 char label at a
/// word boundary, then any path/query/fragment characters.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
    .expect("URL pattern is valid")
});

/// Split `text` into text and link items using freshly generated ids.
pub fn parse_content(text: &str) -> Vec<ContentItem> {
    parse_content_with(text, &mut RandomIds)
}

/// Split `text` into text and link items, drawing ids from `ids`.
///
/// Fragments between URLs are trimmed and dropped when empty, so adjacent
/// URLs come out as consecutive links. Left-to-right order of the input is
/// preserved exactly.
pub fn parse_content_with<I: IdSource + ?Sized>(text: &str, ids: &mut I) -> Vec<ContentItem> {
    let mut items = Vec::new();
    let mut cursor = 0;

    for url in URL_PATTERN.find_iter(text) {
        push_text(&mut items, &text[cursor..url.start()], ids);
        items.push(ContentItem::link(ids.next_id(), url.as_str()));
        cursor = url.end();
    }
    push_text(&mut items, &text[cursor..], ids);

    items
}

fn push_text<I: IdSource + ?Sized>(items: &mut Vec<ContentItem>, fragment: &str, ids: &mut I) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        items.push(ContentItem::text(ids.next_id(), trimmed));
    }
}
