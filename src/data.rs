use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Raw dataset shape: headword to gloss record.
pub type RawEntries = BTreeMap<String, Gloss>;

/// Gloss record attached to a headword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gloss {
    /// Restricted HTML with literal newlines for line breaks.
    #[serde(alias = "a")]
    pub description: String,
}

impl Gloss {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Headword stored alongside its normalized form.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) headword: String,
    pub(crate) normalized: String,
    pub(crate) gloss: Gloss,
}

impl Entry {
    pub fn headword(&self) -> &str {
        &self.headword
    }

    /// Comparison form, never meant for display.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn gloss(&self) -> &Gloss {
        &self.gloss
    }

    pub fn description(&self) -> &str {
        &self.gloss.description
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Failure to produce a usable dictionary. Any variant disables search.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset request returned HTTP {0}")]
    Status(u16),
    #[cfg(feature = "remote")]
    #[error("dataset request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("failed to index dataset: {0}")]
    Index(#[from] fst::Error),
    #[error("failed to load collation data: {0:?}")]
    Collation(icu_collator::CollatorError),
    #[error("remote datasets need the `remote` feature ({0})")]
    RemoteDisabled(String),
}
