//! Corpus-wide statistics, recomputed on demand and cached.
//!
//! Three tables come out of a single pass over the token index: tag unigram
//! frequency, `(word, tag)` frequency, and tag bigram frequency. Only
//! qualifying tokens count (tag in the closed set, surface matching the word
//! pattern); bigrams chain across non-qualifying tokens, so `word1 PUNCT
//! word2` still contributes a `(tag1, tag2)` bigram.

use std::collections::HashMap;

use corpus_types::{Tag, is_word_surface};

use crate::token_index::TokenIndex;

/// The three frequency tables. Persistence goes through the snapshot's
/// record vectors, never through this struct directly (tuple map keys do
/// not serialize to JSON objects).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CorpusStats {
    pub tag_freq: HashMap<Tag, usize>,
    pub word_tag_freq: HashMap<(String, Tag), usize>,
    pub tag_bigram_freq: HashMap<(Tag, Tag), usize>,
}

/// Cache holder. Any index mutation marks it dirty; the next request
/// recomputes. The recompute counter exists so cache behavior is observable.
#[derive(Clone, Debug, Default)]
pub struct StatsAggregator {
    cache: Option<CorpusStats>,
    recomputes: usize,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_cache(cache: Option<CorpusStats>) -> Self {
        Self {
            cache,
            recomputes: 0,
        }
    }

    pub(crate) fn cached(&self) -> Option<&CorpusStats> {
        self.cache.as_ref()
    }

    pub fn mark_dirty(&mut self) {
        self.cache = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_none()
    }

    /// Number of full recomputations performed so far.
    pub fn recompute_count(&self) -> usize {
        self.recomputes
    }

    /// The three tables, recomputing only if dirty.
    pub fn get_or_compute(&mut self, index: &TokenIndex) -> &CorpusStats {
        if self.cache.is_none() {
            self.cache = Some(recompute(index));
            self.recomputes += 1;
        }
        self.cache.as_ref().expect("cache filled above")
    }
}

fn recompute(index: &TokenIndex) -> CorpusStats {
    let mut stats = CorpusStats::default();
    let mut prev_tag: Option<Tag> = None;

    for token in index.tokens() {
        if !token.tag.in_closed_set() || !is_word_surface(&token.surface) {
            // Non-qualifying tokens are skipped without breaking adjacency.
            continue;
        }
        *stats.tag_freq.entry(token.tag).or_default() += 1;
        *stats
            .word_tag_freq
            .entry((token.surface.to_lowercase(), token.tag))
            .or_default() += 1;
        if let Some(prev) = prev_tag {
            *stats.tag_bigram_freq.entry((prev, token.tag)).or_default() += 1;
        }
        prev_tag = Some(token.tag);
    }

    stats
}
