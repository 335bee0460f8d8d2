use ammonia::Builder;
use once_cell::sync::Lazy;

/// Inline markup a gloss may carry.
pub const ALLOWED_TAGS: &[&str] = &["b", "span", "i", "em", "strong", "a", "br"];
/// Attributes kept on any allowed tag.
pub const ALLOWED_ATTRIBUTES: &[&str] = &["href", "class"];
const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];
const DROPPED_WITH_CONTENT: &[&str] = &["script", "style"];

static SANITIZER: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::empty();
    builder
        .add_tags(ALLOWED_TAGS)
        .add_generic_attributes(ALLOWED_ATTRIBUTES)
        .add_url_schemes(URL_SCHEMES)
        .add_clean_content_tags(DROPPED_WITH_CONTENT)
        .link_rel(None)
        .strip_comments(true);
    builder
});

/// Strips everything outside the gloss allow-list.
pub fn sanitize(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}
