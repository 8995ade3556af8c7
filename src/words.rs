//! Category word sets and the provider trait the engine validates against.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, instrument};

/// Topics the server ships datasets for, in display order.
pub const ALL_TOPICS: [&str; 6] = ["name", "country", "city", "animal", "food", "sport"];

/// Read-only lookup of valid words per category.
///
/// Implementations must be safe to share across every session without
/// further synchronization.
pub trait WordSetProvider: Send + Sync {
    /// Returns `true` if `word` (already trimmed and lower-cased) is listed
    /// under `category`.
    fn contains(&self, category: &str, word: &str) -> bool;

    /// Known category ids, in a stable order.
    fn categories(&self) -> Vec<String>;

    /// Returns `true` if `category` is known, even when its list is empty.
    fn has_category(&self, category: &str) -> bool {
        self.categories().iter().any(|c| c == category)
    }
}

/// In-memory word lists keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSets {
    order: Vec<String>,
    sets: HashMap<String, HashSet<String>>,
}

impl WordSets {
    /// Creates an empty collection with no categories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or extends) a category, normalizing every entry.
    ///
    /// Entries are trimmed and lower-cased; blanks are dropped.
    #[instrument(skip(self, words))]
    pub fn insert<I, S>(&mut self, category: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category.trim().to_lowercase();
        if !self.sets.contains_key(&category) {
            self.order.push(category.clone());
        }
        let set = self.sets.entry(category.clone()).or_default();
        let before = set.len();
        set.extend(words.into_iter().filter_map(|w| normalize(w.as_ref())));
        debug!(category = %category, added = set.len() - before, "Extended word set");
    }

    /// Builder-style [`WordSets::insert`].
    pub fn with_category<I, S>(mut self, category: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(category, words);
        self
    }

    /// Number of words per category.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.sets
            .iter()
            .map(|(category, set)| (category.clone(), set.len()))
            .collect()
    }
}

impl WordSetProvider for WordSets {
    fn contains(&self, category: &str, word: &str) -> bool {
        self.sets
            .get(category)
            .is_some_and(|set| set.contains(word))
    }

    fn categories(&self) -> Vec<String> {
        self.order.clone()
    }

    fn has_category(&self, category: &str) -> bool {
        self.sets.contains_key(category)
    }
}

/// Trims and lower-cases a raw entry, dropping blanks.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Word sets that can be swapped wholesale while sessions read them.
///
/// Readers clone the current `Arc` snapshot, so a reload never exposes a
/// half-built collection.
#[derive(Debug, Default)]
pub struct SharedWordSets {
    current: RwLock<Arc<WordSets>>,
}

impl SharedWordSets {
    /// Wraps an initial snapshot.
    pub fn new(sets: WordSets) -> Self {
        Self {
            current: RwLock::new(Arc::new(sets)),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<WordSets> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the snapshot.
    #[instrument(skip(self, sets))]
    pub fn replace(&self, sets: WordSets) {
        let sizes = sets.sizes();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(sets);
        info!(sizes = ?sizes, "Word sets replaced");
    }

    /// Number of words per category in the current snapshot.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.snapshot().sizes()
    }
}

impl WordSetProvider for SharedWordSets {
    fn contains(&self, category: &str, word: &str) -> bool {
        self.snapshot().contains(category, word)
    }

    fn categories(&self) -> Vec<String> {
        self.snapshot().categories()
    }

    fn has_category(&self, category: &str) -> bool {
        self.snapshot().has_category(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Zürich "), Some("zürich".to_string()));
        assert_eq!(normalize(" \t"), None);
    }

    #[test]
    fn categories_keep_insertion_order() {
        let sets = WordSets::new()
            .with_category("food", ["cake"])
            .with_category("Animal", ["Bear"])
            .with_category("food", ["bread"]);
        assert_eq!(sets.categories(), vec!["food".to_string(), "animal".to_string()]);
        assert_eq!(sets.sizes()["food"], 2);
        assert!(sets.contains("animal", "bear"));
    }
}
