use crate::collate::Collation;
use crate::data::{DataSource, Entry, LoadError, RawEntries};
use crate::normalize::normalize;
use fst::automaton::Str;
use fst::{Automaton, IntoStreamer, Map, Streamer};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};
use zstd::stream::decode_all;

/// Immutable headword collection, loaded once.
///
/// Entries are kept in collation order of their normalized form. The FST maps
/// every distinct normalized form to the rank of its first entry, so the
/// first prefix match in collation order is the smallest rank the prefix
/// automaton yields.
pub struct Dictionary {
    entries: Vec<Entry>,
    index: Map<Vec<u8>>,
}

impl Dictionary {
    pub fn from_entries(raw: RawEntries) -> Result<Self, LoadError> {
        let collation = Collation::root().map_err(LoadError::Collation)?;
        let mut entries: Vec<Entry> = raw
            .into_iter()
            .map(|(headword, gloss)| Entry {
                normalized: normalize(&headword),
                headword,
                gloss,
            })
            .collect();
        entries.sort_by(|left, right| {
            collation
                .compare(&left.normalized, &right.normalized)
                .then_with(|| left.headword.cmp(&right.headword))
        });

        let mut first_rank: BTreeMap<&str, u64> = BTreeMap::new();
        for (rank, entry) in entries.iter().enumerate() {
            first_rank
                .entry(entry.normalized.as_str())
                .or_insert(rank as u64);
        }
        let index = Map::from_iter(first_rank)?;
        Ok(Self { entries, index })
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let raw: RawEntries = serde_json::from_slice(bytes)?;
        Self::from_entries(raw)
    }

    /// Reads a local dataset. Files ending in `.zst` are decompressed first.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let bytes = if path.extension().is_some_and(|ext| ext == "zst") {
            decode_all(Cursor::new(bytes))?
        } else {
            bytes
        };
        let dictionary = Self::from_json_slice(&bytes)?;
        info!(source = %path.display(), entries = dictionary.len(), "Loaded dictionary");
        Ok(dictionary)
    }

    /// Downloads the dataset; any non-success status is a load failure.
    #[cfg(feature = "remote")]
    pub async fn fetch(url: &str) -> Result<Self, LoadError> {
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        let dictionary = Self::from_json_slice(&bytes)?;
        info!(source = %url, entries = dictionary.len(), "Fetched dictionary");
        Ok(dictionary)
    }

    /// Loads from a local source. URLs are only reachable through
    /// [`Dictionary::fetch`].
    pub fn load(source: &DataSource) -> Result<Self, LoadError> {
        match source {
            DataSource::File(path) => Self::open(path),
            DataSource::Url(url) => Err(LoadError::RemoteDisabled(url.clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in collation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Exact headword lookup in source orthography.
    pub fn get(&self, headword: &str) -> Option<&Entry> {
        self.get_normalized(&normalize(headword))
            .find(|entry| entry.headword == headword)
    }

    /// All entries whose normalized form equals `normalized`.
    pub fn get_normalized(&self, normalized: &str) -> std::slice::Iter<'_, Entry> {
        self.index
            .get(normalized)
            .map(|rank| self.group_at(rank as usize))
            .unwrap_or(&[])
            .iter()
    }

    /// First entry, in collation order, whose normalized form starts with
    /// `prefix`. The prefix must already be normalized.
    pub fn first_with_prefix(&self, prefix: &str) -> Option<&Entry> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut best: Option<u64> = None;
        while let Some((_, rank)) = stream.next() {
            best = Some(best.map_or(rank, |current| current.min(rank)));
        }
        let found = best.and_then(|rank| self.entries.get(rank as usize));
        debug!(prefix, matched = ?found.map(Entry::headword), "Prefix probe");
        found
    }

    /// Up to `limit` prefix matches in collation order.
    pub fn prefix(&self, prefix: &str, limit: usize) -> Vec<&Entry> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut ranks = Vec::new();
        while let Some((_, rank)) = stream.next() {
            ranks.push(rank as usize);
        }
        ranks.sort_unstable();
        ranks
            .into_iter()
            .flat_map(|rank| self.group_at(rank).iter())
            .take(limit)
            .collect()
    }

    fn group_at(&self, rank: usize) -> &[Entry] {
        let Some(first) = self.entries.get(rank) else {
            return &[];
        };
        let len = self.entries[rank..]
            .iter()
            .take_while(|entry| entry.normalized == first.normalized)
            .count();
        &self.entries[rank..rank + len]
    }
}
