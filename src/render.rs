use crate::annotate::TokenTable;
use crate::sanitize::sanitize;

/// Turns a raw gloss description into display HTML.
///
/// Newlines become `<br>`, the result is sanitized, and only then are the
/// language codes annotated. The annotation markup is produced after the
/// sanitizer has run, so it is never filtered.
pub fn render_gloss(description: &str, tokens: &TokenTable) -> String {
    tokens.annotate_html(&sanitize_gloss(description))
}

/// Line breaks as `<br>`, then the allow-list sanitizer.
pub fn sanitize_gloss(description: &str) -> String {
    sanitize(&description.replace("\r\n", "\n").replace('\n', "<br>"))
}
