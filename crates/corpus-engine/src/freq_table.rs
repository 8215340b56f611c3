//! Word frequency table with per-word tag sets and cached lemmas.
//!
//! The table owns the case-folding merge policy: a capitalized surface folds
//! into its lowercase entry when that entry already has a positive count,
//! otherwise the capitalized surface keeps its own entry. The rule is
//! directional and order-dependent — ingesting `Apple` then `apple` yields
//! two entries, `apple` then `Apple` yields one — and is deliberately not
//! reconciled retroactively, since changing it would change corpus
//! statistics. Lookups and removals resolve the exact surface entry first
//! and fall back to the folded key only for occurrences that were merged at
//! add time, so an entry that kept its own capitalized key is always
//! decremented directly.
//!
//! Lemmas are memoized per `(word, tag)` pair and never recomputed once
//! cached, even when a tag is removed and re-added. That preserves user
//! corrections without re-querying the Lemmatizer.

use std::collections::{BTreeMap, HashMap};

use corpus_types::Tag;
use serde::{Deserialize, Serialize};

use crate::errors::CorpusError;

/// Frequency entry for one word key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    /// Number of valid-word occurrences folded into this key. Always >= 1
    /// while the entry exists.
    pub count: usize,
    /// Distinct tags recorded for this key, each with its cached lemma.
    /// Manually editable, so this can diverge from tags actually observed.
    pub tags: BTreeMap<Tag, String>,
}

#[derive(Clone, Debug, Default)]
pub struct FrequencyTagTable {
    entries: HashMap<String, WordEntry>,
    lemma_memo: HashMap<(String, Tag), String>,
}

impl FrequencyTagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        entries: HashMap<String, WordEntry>,
        lemma_memo: HashMap<(String, Tag), String>,
    ) -> Self {
        Self {
            entries,
            lemma_memo,
        }
    }

    pub(crate) fn parts(&self) -> (&HashMap<String, WordEntry>, &HashMap<(String, Tag), String>) {
        (&self.entries, &self.lemma_memo)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry key a surface form resolves to: the exact surface when an
    /// entry exists under it, otherwise the folded key.
    pub fn resolve_key(&self, word: &str) -> Option<&str> {
        let key = self.lookup_key(word);
        self.entries.get_key_value(key.as_str()).map(|(k, _)| k.as_str())
    }

    /// Record one occurrence, creating the entry if needed and caching the
    /// lemma for a first-seen `(word, tag)` pair. Returns the resolved key.
    pub fn add_occurrence<F>(&mut self, word: &str, tag: Tag, lemma_fn: F) -> String
    where
        F: FnOnce(&str, Tag) -> String,
    {
        let key = self.fold(word);
        let lemma = self
            .lemma_memo
            .entry((key.clone(), tag))
            .or_insert_with(|| lemma_fn(word, tag))
            .clone();
        let entry = self.entries.entry(key.clone()).or_default();
        entry.count += 1;
        entry.tags.entry(tag).or_insert(lemma);
        key
    }

    /// Remove one occurrence from the entry `word` resolves to; the entry is
    /// dropped entirely when its count reaches zero. Returns the remaining
    /// count. The exact surface entry wins over the folded key, so a
    /// capitalized entry that was never merged keeps its own count balanced.
    pub fn remove_occurrence(&mut self, word: &str) -> Result<usize, CorpusError> {
        let key = self.lookup_key(word);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| CorpusError::UnknownWord(word.to_string()))?;
        entry.count -= 1;
        let remaining = entry.count;
        if remaining == 0 {
            self.entries.remove(&key);
        }
        Ok(remaining)
    }

    /// Manually record a tag for an existing word, independent of occurrence
    /// counts. The lemma comes from the memo when the pair was seen before.
    pub fn add_tag<F>(&mut self, word: &str, tag: Tag, lemma_fn: F) -> Result<(), CorpusError>
    where
        F: FnOnce(&str, Tag) -> String,
    {
        let key = self.lookup_key(word);
        if !self.entries.contains_key(&key) {
            return Err(CorpusError::UnknownWord(word.to_string()));
        }
        let lemma = self
            .lemma_memo
            .entry((key.clone(), tag))
            .or_insert_with(|| lemma_fn(word, tag))
            .clone();
        self.entries
            .get_mut(&key)
            .expect("entry checked above")
            .tags
            .entry(tag)
            .or_insert(lemma);
        Ok(())
    }

    /// Manually remove a recorded tag. The lemma memo is kept so a re-added
    /// tag reuses the cached lemma.
    pub fn remove_tag(&mut self, word: &str, tag: Tag) -> Result<(), CorpusError> {
        let key = self.lookup_key(word);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| CorpusError::UnknownWord(word.to_string()))?;
        entry.tags.remove(&tag).ok_or(CorpusError::UnknownTag {
            word: word.to_string(),
            tag,
        })?;
        Ok(())
    }

    pub fn has_tag(&self, word: &str, tag: Tag) -> bool {
        let key = self.lookup_key(word);
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.tags.contains_key(&tag))
    }

    /// Total lookup by exact stored key: `(0, empty)` when absent.
    pub fn get(&self, word: &str) -> (usize, BTreeMap<Tag, String>) {
        match self.entries.get(word) {
            Some(entry) => (entry.count, entry.tags.clone()),
            None => (0, BTreeMap::new()),
        }
    }

    /// Sorted word list for the presentation layer.
    pub fn words(&self) -> Vec<String> {
        let mut words: Vec<String> = self.entries.keys().cloned().collect();
        words.sort();
        words
    }

    /// Resolution for existing entries: the exact surface key when present,
    /// the folded key otherwise. Used by everything except `add_occurrence`,
    /// which must apply the directional fold even when it creates the entry.
    fn lookup_key(&self, word: &str) -> String {
        if self.entries.contains_key(word) {
            return word.to_string();
        }
        self.fold(word)
    }

    /// Directional case folding: a capitalized surface maps to its lowercase
    /// form only when that entry already has a positive count.
    fn fold(&self, word: &str) -> String {
        let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
        if capitalized {
            let lower = word.to_lowercase();
            if self.entries.get(&lower).is_some_and(|e| e.count > 0) {
                return lower;
            }
        }
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lemma(word: &str, _tag: Tag) -> String {
        word.to_lowercase()
    }

    #[test]
    fn folding_is_directional() {
        // Lowercase first: the capitalized occurrence folds in.
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("apple", Tag::Nn, no_lemma);
        table.add_occurrence("Apple", Tag::Nn, no_lemma);
        assert_eq!(table.get("apple").0, 2);
        assert_eq!(table.get("Apple").0, 0);

        // Capitalized first: two separate entries.
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("Apple", Tag::Nn, no_lemma);
        table.add_occurrence("apple", Tag::Nn, no_lemma);
        assert_eq!(table.get("Apple").0, 1);
        assert_eq!(table.get("apple").0, 1);
    }

    #[test]
    fn removal_resolves_through_the_same_fold() {
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("apple", Tag::Nn, no_lemma);
        table.add_occurrence("Apple", Tag::Nn, no_lemma);
        assert_eq!(table.remove_occurrence("Apple").unwrap(), 1);
        assert_eq!(table.get("apple").0, 1);
    }

    #[test]
    fn removal_prefers_the_exact_entry_when_both_exist() {
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("Apple", Tag::Nnp, no_lemma);
        table.add_occurrence("apple", Tag::Nn, no_lemma);

        // The capitalized occurrence was never merged, so removing it must
        // not touch the lowercase entry.
        assert_eq!(table.remove_occurrence("Apple").unwrap(), 0);
        assert_eq!(table.get("Apple").0, 0);
        assert_eq!(table.get("apple").0, 1);
    }

    #[test]
    fn entry_disappears_at_zero() {
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("cat", Tag::Nn, no_lemma);
        assert_eq!(table.remove_occurrence("cat").unwrap(), 0);
        assert_eq!(table.get("cat").0, 0);
        assert!(matches!(
            table.remove_occurrence("cat"),
            Err(CorpusError::UnknownWord(_))
        ));
    }

    #[test]
    fn lemma_computed_once_per_word_tag_pair() {
        let mut table = FrequencyTagTable::new();
        let mut calls = 0;
        table.add_occurrence("cats", Tag::Nns, |w, _| {
            calls += 1;
            w.trim_end_matches('s').to_string()
        });
        table.add_occurrence("cats", Tag::Nns, |_, _| {
            unreachable!("lemma already memoized")
        });
        assert_eq!(calls, 1);
        assert_eq!(table.get("cats").1[&Tag::Nns], "cat");
    }

    #[test]
    fn removed_tag_reuses_the_memoized_lemma() {
        let mut table = FrequencyTagTable::new();
        table.add_occurrence("cats", Tag::Nns, |_, _| "cat".to_string());
        table.remove_tag("cats", Tag::Nns).unwrap();
        assert!(table.get("cats").1.is_empty());
        // Re-adding must not call the lemmatizer again.
        table
            .add_tag("cats", Tag::Nns, |_, _| unreachable!("memo must win"))
            .unwrap();
        assert_eq!(table.get("cats").1[&Tag::Nns], "cat");
    }

    #[test]
    fn manual_tag_edits_are_strict() {
        let mut table = FrequencyTagTable::new();
        assert!(matches!(
            table.add_tag("ghost", Tag::Nn, no_lemma),
            Err(CorpusError::UnknownWord(_))
        ));
        table.add_occurrence("cat", Tag::Nn, no_lemma);
        assert!(matches!(
            table.remove_tag("cat", Tag::Vb),
            Err(CorpusError::UnknownTag { .. })
        ));
    }

    #[test]
    fn words_are_sorted() {
        let mut table = FrequencyTagTable::new();
        for w in ["zebra", "ant", "mole"] {
            table.add_occurrence(w, Tag::Nn, no_lemma);
        }
        assert_eq!(table.words(), vec!["ant", "mole", "zebra"]);
    }
}
