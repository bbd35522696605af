//! Field parsing rules for text scraped from feed elements.

use url::Url;

/// First numeric token of a free-text label, thousand separators stripped:
/// `"Local Guide · 1.234 reviews"` yields `1234`. No digits yields `0`.
pub fn leading_count(text: &str) -> u32 {
    let start = match text.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => idx,
        None => return 0,
    };
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || is_group_separator(*c))
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(u32::MAX)
}

/// Provider-declared feed size from a label such as `"1,234 reviews"`.
/// All digit groups are concatenated; `None` when the label has no digits.
pub fn declared_count(label: &str) -> Option<u32> {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

/// Endorsement counters render as bare numbers or not at all.
pub fn endorsement_count(text: Option<&str>) -> u32 {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(leading_count)
        .unwrap_or(0)
}

pub fn clamp_rating(active_markers: usize) -> u8 {
    active_markers.min(5) as u8
}

/// Requests the feed in `language` by setting the `hl` query parameter.
pub fn localized_feed_url(feed_url: &str, language: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(feed_url.trim())?;
    if language.is_empty() {
        return Ok(url.into());
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "hl")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("hl", language);
    Ok(url.into())
}

fn is_group_separator(c: char) -> bool {
    matches!(c, '.' | ',' | '\'' | ' ' | '\u{a0}' | '\u{202f}')
}
