mod annotate;
mod collate;
mod data;
mod deeplink;
mod normalize;
mod render;
mod sanitize;
mod search;
mod store;
#[cfg(feature = "web")]
pub mod web;

pub use annotate::{Annotation, HIGHLIGHT_CLASS, TokenTable, render_html};
pub use collate::Collation;
pub use data::{DataSource, Entry, Gloss, LoadError, RawEntries};
pub use deeplink::{DeepLink, decode_fragment, fragment_for};
pub use normalize::normalize;
pub use render::{render_gloss, sanitize_gloss};
pub use sanitize::{ALLOWED_ATTRIBUTES, ALLOWED_TAGS, sanitize};
pub use search::{InvalidQuery, MatchResult, SearchOutcome, SearchSession, resolve};
pub use store::Dictionary;

use std::fmt;
use tracing::error;

/// Status line shown while the dictionary is unavailable.
pub const UNAVAILABLE_MESSAGE: &str = "Yoksa bir yerlerde bir harf mi kayıp?";

/// Summary shown above the search box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready { entries: usize },
    Unavailable,
}

impl Status {
    pub fn of(dictionary: &Result<Dictionary, LoadError>) -> Self {
        match dictionary {
            Ok(dictionary) => Status::Ready {
                entries: dictionary.len(),
            },
            Err(_) => Status::Unavailable,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready { entries } => {
                write!(f, "Portrait of Proto-Turkic in {entries} Entries.")
            }
            Status::Unavailable => write!(f, "{UNAVAILABLE_MESSAGE}"),
        }
    }
}

/// Everything a front end needs to redraw after one input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupView {
    pub headword: Option<String>,
    /// Sanitized and annotated gloss of the matched headword.
    pub gloss_html: Option<String>,
    pub ghost: String,
    pub error: bool,
    /// Search is switched off because the dataset failed to load.
    pub disabled: bool,
    pub deep_link: DeepLink,
}

impl LookupView {
    fn neutral() -> Self {
        Self {
            headword: None,
            gloss_html: None,
            ghost: String::new(),
            error: false,
            disabled: false,
            deep_link: DeepLink::Clear,
        }
    }

    fn disabled() -> Self {
        Self {
            error: true,
            disabled: true,
            deep_link: DeepLink::Keep,
            ..Self::neutral()
        }
    }

    /// Builds the view for a resolved search. `None` for `Unchanged`.
    pub fn from_outcome(outcome: &SearchOutcome<'_>, tokens: &TokenTable) -> Option<Self> {
        let view = match outcome {
            SearchOutcome::Unchanged => return None,
            SearchOutcome::Cleared => Self::neutral(),
            SearchOutcome::Invalid(_) => Self {
                error: true,
                deep_link: DeepLink::Keep,
                ..Self::neutral()
            },
            SearchOutcome::NoMatch => Self {
                error: true,
                ..Self::neutral()
            },
            SearchOutcome::Match(found) => Self {
                headword: Some(found.headword.to_string()),
                gloss_html: Some(render_gloss(&found.gloss.description, tokens)),
                ghost: found.ghost_suffix.to_string(),
                deep_link: DeepLink::Set(fragment_for(found.headword)),
                ..Self::neutral()
            },
        };
        Some(view)
    }
}

/// A search box bound to one dictionary load.
///
/// A failed load is kept rather than retried: every later input reports the
/// disabled state and nothing is searched.
pub struct Lookup {
    dictionary: Result<Dictionary, LoadError>,
    session: SearchSession,
    tokens: TokenTable,
}

impl Lookup {
    pub fn new(dictionary: Result<Dictionary, LoadError>) -> Self {
        if let Err(err) = &dictionary {
            error!(%err, "Dictionary unavailable; search disabled");
        }
        Self {
            dictionary,
            session: SearchSession::new(),
            tokens: TokenTable::default(),
        }
    }

    pub fn with_tokens(mut self, tokens: TokenTable) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn open(source: &DataSource) -> Self {
        Self::new(Dictionary::load(source))
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref().ok()
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.dictionary.as_ref().err()
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn status(&self) -> Status {
        Status::of(&self.dictionary)
    }

    /// Handles one input event. `None` means nothing changed since the last
    /// call and the front end should leave its state alone.
    pub fn input(&mut self, query: &str) -> Option<LookupView> {
        let Ok(dictionary) = &self.dictionary else {
            return Some(LookupView::disabled());
        };
        let outcome = self.session.search(dictionary, query);
        LookupView::from_outcome(&outcome, &self.tokens)
    }

    /// Seeds the search from a URL fragment on page load.
    pub fn restore(&mut self, fragment: &str) -> Option<LookupView> {
        let query = decode_fragment(fragment)?;
        self.input(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> Lookup {
        Lookup::new(Dictionary::from_json_slice(
            r#"{"agız": {"description": "tur word meaning mouth"}, "ağaç": {"a": "tree"}}"#
                .as_bytes(),
        ))
    }

    fn failed() -> Lookup {
        Lookup::new(Dictionary::from_json_slice(b"{ not json"))
    }

    #[test]
    fn match_renders_gloss_ghost_and_link() {
        let mut lookup = lookup();
        let view = lookup.input("agı").unwrap();
        assert_eq!(view.headword.as_deref(), Some("agız"));
        assert_eq!(view.ghost, "z");
        assert!(!view.error);
        assert_eq!(view.deep_link, DeepLink::Set("#ag%C4%B1z".into()));
        assert_eq!(
            view.gloss_html.as_deref(),
            Some(r#"<b>Turkish</b> <span class="pink">word</span> meaning mouth"#)
        );
    }

    #[test]
    fn no_match_sets_error_and_clears_link() {
        let view = lookup().input("zzz").unwrap();
        assert!(view.error);
        assert!(view.ghost.is_empty());
        assert!(view.headword.is_none());
        assert_eq!(view.deep_link, DeepLink::Clear);
    }

    #[test]
    fn invalid_input_keeps_link() {
        let view = lookup().input(" agız").unwrap();
        assert!(view.error);
        assert!(view.ghost.is_empty());
        assert_eq!(view.deep_link, DeepLink::Keep);
    }

    #[test]
    fn empty_input_is_neutral() {
        let mut lookup = lookup();
        lookup.input("ag");
        let view = lookup.input("").unwrap();
        assert_eq!(view, LookupView::neutral());
        assert!(lookup.input("").is_none());
    }

    #[test]
    fn failed_load_disables_every_query() {
        let mut lookup = failed();
        assert_eq!(lookup.status(), Status::Unavailable);
        assert_eq!(lookup.status().to_string(), UNAVAILABLE_MESSAGE);
        assert!(lookup.dictionary().is_none());
        assert!(matches!(lookup.load_error(), Some(LoadError::Malformed(_))));
        for query in ["agı", "", " x", "zzz", "agı"] {
            let view = lookup.input(query).unwrap();
            assert!(view.disabled && view.error, "{query:?}");
            assert!(view.headword.is_none() && view.gloss_html.is_none());
            assert!(view.ghost.is_empty());
        }
    }

    #[test]
    fn status_reports_entry_count() {
        let lookup = lookup();
        assert_eq!(lookup.status(), Status::Ready { entries: 2 });
        assert_eq!(
            lookup.status().to_string(),
            "Portrait of Proto-Turkic in 2 Entries."
        );
    }

    #[test]
    fn status_of_a_load_result() {
        assert_eq!(
            Status::of(&Dictionary::from_json_slice(b"{}")),
            Status::Ready { entries: 0 }
        );
        assert_eq!(
            Status::of(&Dictionary::from_json_slice(b"[]")),
            Status::Unavailable
        );
    }

    #[test]
    fn restore_runs_one_search_from_fragment() {
        let mut lookup = lookup();
        let view = lookup.restore("#a%C4%9Fa").unwrap();
        assert_eq!(view.headword.as_deref(), Some("ağaç"));
        assert_eq!(view.ghost, "ç");
        assert!(lookup.restore("#a%C4%9Fa").is_none());
        assert!(lookup.restore("#").is_none());
    }

    #[test]
    fn custom_token_table_is_used_for_rendering() {
        let mut lookup = lookup().with_tokens(TokenTable::new([("meaning", "glossed as")]));
        let view = lookup.input("agız").unwrap();
        assert_eq!(
            view.gloss_html.as_deref(),
            Some(r#"tur word <b>glossed as</b> <span class="pink">mouth</span>"#)
        );
    }
}
