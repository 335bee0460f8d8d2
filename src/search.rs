use crate::data::{Entry, Gloss};
use crate::normalize::normalize;
use crate::store::Dictionary;
use std::fmt;
use tracing::debug;

/// Why a non-empty query was refused before searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidQuery {
    LeadingWhitespace,
    BlankInput,
}

impl fmt::Display for InvalidQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidQuery::LeadingWhitespace => write!(f, "query starts with whitespace"),
            InvalidQuery::BlankInput => write!(f, "query is only whitespace"),
        }
    }
}

/// The first headword, in collation order, extending the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'d> {
    pub headword: &'d str,
    pub normalized: &'d str,
    pub gloss: &'d Gloss,
    /// Characters of the normalized headword beyond the normalized query.
    pub ghost_suffix: &'d str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome<'d> {
    /// Same normalized query as the previous call.
    Unchanged,
    /// Empty query: neutral state.
    Cleared,
    Invalid(InvalidQuery),
    NoMatch,
    Match(MatchResult<'d>),
}

impl SearchOutcome<'_> {
    pub fn is_error(&self) -> bool {
        matches!(self, SearchOutcome::Invalid(_) | SearchOutcome::NoMatch)
    }
}

/// Per-input session state. Owned by the caller, one per search box.
#[derive(Debug, Default, Clone)]
pub struct SearchSession {
    last_query: Option<String>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized form of the last query that was searched.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Forgets the previous query so the next call always searches.
    pub fn reset(&mut self) {
        self.last_query = None;
    }

    pub fn search<'d>(&mut self, dictionary: &'d Dictionary, query: &str) -> SearchOutcome<'d> {
        let normalized = normalize(query);
        if self.last_query.as_deref() == Some(normalized.as_str()) {
            return SearchOutcome::Unchanged;
        }
        let outcome = resolve(dictionary, query, &normalized);
        debug!(query, outcome = outcome_label(&outcome), "Search");
        self.last_query = Some(normalized);
        outcome
    }
}

/// Stateless resolution of a single query.
pub fn resolve<'d>(dictionary: &'d Dictionary, query: &str, normalized: &str) -> SearchOutcome<'d> {
    if query.is_empty() {
        return SearchOutcome::Cleared;
    }
    if query.trim().is_empty() {
        return SearchOutcome::Invalid(InvalidQuery::BlankInput);
    }
    if query.starts_with(char::is_whitespace) {
        return SearchOutcome::Invalid(InvalidQuery::LeadingWhitespace);
    }
    match dictionary.first_with_prefix(normalized) {
        Some(entry) => SearchOutcome::Match(match_for(entry, normalized.len())),
        None => SearchOutcome::NoMatch,
    }
}

fn match_for(entry: &Entry, typed_len: usize) -> MatchResult<'_> {
    MatchResult {
        headword: entry.headword(),
        normalized: entry.normalized(),
        gloss: entry.gloss(),
        ghost_suffix: &entry.normalized()[typed_len..],
    }
}

fn outcome_label(outcome: &SearchOutcome<'_>) -> &'static str {
    match outcome {
        SearchOutcome::Unchanged => "unchanged",
        SearchOutcome::Cleared => "cleared",
        SearchOutcome::Invalid(_) => "invalid",
        SearchOutcome::NoMatch => "no_match",
        SearchOutcome::Match(_) => "match",
    }
}
