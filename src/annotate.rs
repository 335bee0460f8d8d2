use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// CSS class wrapped around the word a code refers to.
pub const HIGHLIGHT_CLASS: &str = "pink";

const DEFAULT_CODES: &[(&str, &str)] = &[
    ("bgx", "Balkan Gagauz Turkish"),
    ("kmz", "Khorasani Turkish"),
    ("ota", "Ottoman Turkish"),
    ("otk", "Old Turkish"),
    ("tur", "Turkish"),
    ("crh", "Crimean Turkish"),
    ("sah", "Yakut"),
    ("ybe", "West Yugur"),
    ("tuk", "Turkmen"),
    ("xng", "Middle Mongolian"),
    ("mon", "Mongolian"),
    ("cmg", "Classical Mongolian"),
    ("ptr", "Proto-Turkic"),
];

static DEFAULT_TABLE: Lazy<TokenTable> =
    Lazy::new(|| TokenTable::new(DEFAULT_CODES.iter().copied()));

/// One piece of an annotated gloss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation<'a> {
    /// Sanitized HTML passed through unchanged.
    Markup(&'a str),
    /// A language code bound to the word that follows it.
    Reference {
        code: &'a str,
        label: &'a str,
        spacing: &'a str,
        word: &'a str,
    },
}

/// Case-insensitive mapping from short language codes to display labels.
#[derive(Debug, Clone)]
pub struct TokenTable {
    labels: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl Default for TokenTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl TokenTable {
    pub fn new<I, K, V>(codes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let labels: HashMap<String, String> = codes
            .into_iter()
            .map(|(code, label)| (code.as_ref().to_lowercase(), label.into()))
            .filter(|(code, _)| !code.is_empty())
            .collect();
        let mut alternatives: Vec<&str> = labels.keys().map(String::as_str).collect();
        // Longest first so a code never shadows a longer one sharing its start.
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = if alternatives.is_empty() {
            None
        } else {
            let body = alternatives
                .iter()
                .map(|code| regex::escape(code))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\b(?:{body})\b")).ok()
        };
        Self { labels, pattern }
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.labels.get(&code.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Splits sanitized HTML into pass-through markup and code references.
    ///
    /// Codes are only recognised in text, never inside a tag. A code binds to
    /// the next whitespace-delimited word; a code with nothing to bind to is
    /// dropped from the output.
    pub fn annotate<'a>(&'a self, html: &'a str) -> Vec<Annotation<'a>> {
        let Some(pattern) = &self.pattern else {
            return vec![Annotation::Markup(html)];
        };
        let tags = tag_spans(html);
        let mut parts = Vec::new();
        let mut cursor = 0;
        for found in pattern.find_iter(html) {
            if found.start() < cursor || inside_tag(&tags, found.start()) {
                continue;
            }
            let Some(label) = self.label(found.as_str()) else {
                continue;
            };
            if found.start() > cursor {
                parts.push(Annotation::Markup(&html[cursor..found.start()]));
            }
            match bound_word(html, &tags, found.end()) {
                Some((spacing_end, word_end)) => {
                    let bound = text_between(html, &tags, spacing_end, word_end);
                    let word = if self.label(&bound).is_some() {
                        &html[spacing_end..spacing_end]
                    } else {
                        &html[spacing_end..word_end]
                    };
                    parts.push(Annotation::Reference {
                        code: found.as_str(),
                        label,
                        spacing: &html[found.end()..spacing_end],
                        word,
                    });
                    if word.is_empty() {
                        // A code never shows as a word; its markup is kept.
                        parts.extend(
                            tags.iter()
                                .filter(|&&(start, _)| start >= spacing_end && start < word_end)
                                .map(|&(start, end)| Annotation::Markup(&html[start..end])),
                        );
                    }
                    cursor = word_end;
                }
                None => cursor = found.end(),
            }
        }
        if cursor < html.len() {
            parts.push(Annotation::Markup(&html[cursor..]));
        }
        parts
    }

    /// Annotates and renders in one step.
    pub fn annotate_html(&self, html: &str) -> String {
        render_html(&self.annotate(html))
    }
}

/// Renders annotations as HTML: bold label, original spacing, highlighted word.
pub fn render_html(parts: &[Annotation<'_>]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            Annotation::Markup(markup) => out.push_str(markup),
            Annotation::Reference {
                label,
                spacing,
                word,
                ..
            } => {
                out.push_str("<b>");
                out.push_str(label);
                out.push_str("</b>");
                out.push_str(spacing);
                out.push_str("<span class=\"");
                out.push_str(HIGHLIGHT_CLASS);
                out.push_str("\">");
                out.push_str(word);
                out.push_str("</span>");
            }
        }
    }
    out
}

/// Byte ranges of every `<...>` tag, honouring quoted attribute values.
fn tag_spans(html: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut quote = None;
    for (idx, ch) in html.char_indices() {
        match (start, quote, ch) {
            (None, _, '<') => start = Some(idx),
            (Some(_), None, '"' | '\'') => quote = Some(ch),
            (Some(_), Some(open), _) if ch == open => quote = None,
            (Some(begin), None, '>') => {
                spans.push((begin, idx + 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        spans.push((begin, html.len()));
    }
    spans
}

fn inside_tag(tags: &[(usize, usize)], pos: usize) -> bool {
    tag_at(tags, pos).is_some()
}

fn tag_at(tags: &[(usize, usize)], pos: usize) -> Option<(usize, usize)> {
    let idx = tags.partition_point(|&(start, _)| start <= pos);
    idx.checked_sub(1)
        .map(|i| tags[i])
        .filter(|&(_, end)| pos < end)
}

/// Text of `html[start..end]` with tags removed.
fn text_between(html: &str, tags: &[(usize, usize)], start: usize, end: usize) -> String {
    let mut text = String::new();
    let mut pos = start;
    while pos < end {
        match tag_at(tags, pos) {
            Some((_, tag_end)) => pos = tag_end.min(end),
            None => {
                let next = tags
                    .iter()
                    .map(|&(tag_start, _)| tag_start)
                    .find(|&tag_start| tag_start > pos)
                    .map_or(end, |tag_start| tag_start.min(end));
                text.push_str(&html[pos..next]);
                pos = next;
            }
        }
    }
    text
}

/// Locates the whitespace run after a code and the word after it.
///
/// Returns the end of the spacing and the end of the word, or `None` when
/// the code is not followed by whitespace and at least one word character.
/// Tags inside the word are carried along untouched.
fn bound_word(html: &str, tags: &[(usize, usize)], from: usize) -> Option<(usize, usize)> {
    let spacing_end = html[from..]
        .char_indices()
        .find(|&(offset, ch)| !ch.is_whitespace() || inside_tag(tags, from + offset))
        .map_or(html.len(), |(offset, _)| from + offset);
    if spacing_end == from {
        return None;
    }

    let mut pos = spacing_end;
    while pos < html.len() {
        if let Some((_, end)) = tag_at(tags, pos) {
            pos = end;
            continue;
        }
        let ch = html[pos..].chars().next()?;
        if ch.is_whitespace() {
            break;
        }
        pos += ch.len_utf8();
    }
    if pos == spacing_end {
        None
    } else {
        Some((spacing_end, pos))
    }
}
