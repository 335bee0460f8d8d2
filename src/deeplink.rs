use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

// URL fragment encode set, plus `#` and `%` so decoding round-trips.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'%');

/// How the page URL fragment should change after a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Keep,
    Clear,
    Set(String),
}

/// `#headword`, percent-encoded.
pub fn fragment_for(headword: &str) -> String {
    format!("#{}", utf8_percent_encode(headword, FRAGMENT))
}

/// Headword carried by a URL fragment, with or without the leading `#`.
pub fn decode_fragment(fragment: &str) -> Option<String> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    if raw.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    Some(decoded)
}
