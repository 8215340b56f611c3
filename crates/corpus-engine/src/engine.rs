//! The engine façade composing buffer, index, frequency table, and stats.
//!
//! All mutating operations require `&mut self`; callers wanting concurrent
//! readers put the engine behind a single reader/writer lock. Each engine
//! instance owns freshly allocated tables — nothing is shared between
//! instances.
//!
//! Ingestion is split into [`PreparedDocument::tokenize`] (pure, can run off
//! the write path, discarded on cancellation) and
//! [`CorpusEngine::commit_document`] (one atomic merge), so a long tokenize
//! of a large document never holds the engine exclusively. Every mutation
//! either completes or leaves the engine in its pre-operation state.

use std::collections::BTreeSet;

use corpus_types::{Lemmatizer, Tag, TaggedToken, TokenSpan, Tokenizer, is_word_surface};
use tracing::info;

use crate::errors::CorpusError;
use crate::freq_table::FrequencyTagTable;
use crate::raw_text::{DocSpan, RawTextBuffer, normalize_text};
use crate::snapshot::Snapshot;
use crate::stats::{CorpusStats, StatsAggregator};
use crate::token_index::{SpliceOutcome, TokenIndex};

/// Default token radius for word-in-context extraction.
pub const DEFAULT_CONTEXT_RADIUS: usize = 5;

/// A tokenized-but-not-yet-merged document: the collaborator's private
/// working copy. Dropping it cancels the ingestion with no engine effect.
#[derive(Clone, Debug)]
pub struct PreparedDocument {
    text: String,
    spans: Vec<TokenSpan>,
}

impl PreparedDocument {
    /// Normalize and tokenize `text` without touching any engine state.
    pub fn tokenize<T: Tokenizer>(tokenizer: &T, text: &str) -> Result<Self, CorpusError> {
        let text = normalize_text(text);
        let spans = tokenizer.tokenize_and_tag(&text)?;
        Ok(Self { text, spans })
    }

    pub fn token_count(&self) -> usize {
        self.spans.len()
    }
}

/// Outcome of a completed ingestion.
#[derive(Clone, Debug)]
pub struct IngestReport {
    pub document: DocSpan,
    pub token_count: usize,
    pub word_count: usize,
}

/// Sorted word list plus the drained (read-once) set of recently modified
/// words, for highlighting by the presentation layer.
#[derive(Clone, Debug)]
pub struct WordListing {
    pub words: Vec<String>,
    pub modified: Vec<String>,
}

/// A word-in-context excerpt with the matched span located inside `text`.
#[derive(Clone, Debug)]
pub struct ContextHit {
    pub text: String,
    pub match_start: usize,
    pub match_end: usize,
    pub token_index: usize,
}

/// One `(gap, token, display tag)` triple of the annotated rendering.
#[derive(Clone, Debug)]
pub struct AnnotatedSpan {
    pub gap: String,
    pub text: String,
    pub tag: Tag,
}

/// The corpus index and mutation engine.
pub struct CorpusEngine<T, L> {
    buffer: RawTextBuffer,
    index: TokenIndex,
    freq: FrequencyTagTable,
    stats: StatsAggregator,
    tokenizer: T,
    lemmatizer: L,
    touched: BTreeSet<String>,
}

/// Valid word: tag in the closed set and surface matching the word pattern.
fn qualifies(token: &TaggedToken) -> bool {
    token.tag.in_closed_set() && is_word_surface(&token.surface)
}

impl<T: Tokenizer, L: Lemmatizer> CorpusEngine<T, L> {
    pub fn new(tokenizer: T, lemmatizer: L) -> Self {
        Self {
            buffer: RawTextBuffer::new(),
            index: TokenIndex::new(),
            freq: FrequencyTagTable::new(),
            stats: StatsAggregator::new(),
            tokenizer,
            lemmatizer,
            touched: BTreeSet::new(),
        }
    }

    pub fn buffer(&self) -> &RawTextBuffer {
        &self.buffer
    }

    pub fn index(&self) -> &TokenIndex {
        &self.index
    }

    pub fn frequency(&self) -> &FrequencyTagTable {
        &self.freq
    }

    pub fn stats_recompute_count(&self) -> usize {
        self.stats.recompute_count()
    }

    /// Tokenize and merge a document in one call. A tagger failure aborts
    /// before any state is touched.
    pub fn ingest(&mut self, name: &str, text: &str) -> Result<IngestReport, CorpusError> {
        let prepared = PreparedDocument::tokenize(&self.tokenizer, text)?;
        Ok(self.commit_document(name, prepared))
    }

    /// Merge an already-tokenized document as a single atomic step: buffer
    /// append, index append, frequency updates, stats invalidation.
    pub fn commit_document(&mut self, name: &str, prepared: PreparedDocument) -> IngestReport {
        let span = self.buffer.append_document(name, &prepared.text);
        let token_count = prepared.spans.len();

        let mut word_count = 0;
        for s in &prepared.spans {
            if s.tag.in_closed_set() && is_word_surface(&s.surface) {
                let lemmatizer = &self.lemmatizer;
                let key = self
                    .freq
                    .add_occurrence(&s.surface, s.tag, |w, t| lemmatizer.lemmatize(w, t));
                self.touched.insert(key);
                word_count += 1;
            }
        }

        self.index.append_tagged(prepared.spans, span.start);
        self.stats.mark_dirty();
        info!(
            "ingested {:?}: {} tokens, {} word occurrences",
            span.name, token_count, word_count
        );

        IngestReport {
            document: span,
            token_count,
            word_count,
        }
    }

    /// Replace the token at `index` with `new_text` (zero or more tokens
    /// after re-tagging), patching buffer offsets, the frequency table, and
    /// the stats cache. The index splice reads the pre-edit offsets; the
    /// buffer splice then uses those same bounds.
    pub fn replace_token(
        &mut self,
        index: usize,
        new_text: &str,
    ) -> Result<SpliceOutcome, CorpusError> {
        let new_text = normalize_text(new_text);
        let tokenizer = &self.tokenizer;
        let outcome = self
            .index
            .splice_replace(index, &new_text, |t| tokenizer.tokenize_and_tag(t))?;
        self.buffer.splice(
            outcome.removed.start,
            outcome.removed.surface.len(),
            &new_text,
        )?;

        if qualifies(&outcome.removed) {
            if let Some(key) = self.freq.resolve_key(&outcome.removed.surface) {
                self.touched.insert(key.to_string());
            }
            self.freq.remove_occurrence(&outcome.removed.surface)?;
        }
        for token in &outcome.inserted {
            if qualifies(token) {
                let lemmatizer = &self.lemmatizer;
                let key = self
                    .freq
                    .add_occurrence(&token.surface, token.tag, |w, t| lemmatizer.lemmatize(w, t));
                self.touched.insert(key);
            }
        }

        self.stats.mark_dirty();
        info!(
            "replaced token {} ({:?} -> {} tokens, delta {})",
            index,
            outcome.removed.surface,
            outcome.inserted.len(),
            outcome.delta
        );
        Ok(outcome)
    }

    /// Swap the tag of the token at `index`, reconciling the word's recorded
    /// tag set. Returns the old tag.
    pub fn replace_tag(&mut self, index: usize, new_tag: Tag) -> Result<Tag, CorpusError> {
        let token = self.index.get(index).ok_or(CorpusError::IndexOutOfRange {
            index,
            len: self.index.len(),
        })?;
        let surface = token.surface.clone();
        let old_tag = token.tag;
        if old_tag == new_tag {
            return Ok(old_tag);
        }

        self.index.set_tag(index, new_tag)?;
        if is_word_surface(&surface)
            && let Some(key) = self.freq.resolve_key(&surface)
        {
            let key = key.to_string();
            // The recorded tag set can drift from observed tags (manual
            // edits), so only remove what is actually recorded.
            if self.freq.has_tag(&key, old_tag) {
                self.freq.remove_tag(&key, old_tag)?;
            }
            let lemmatizer = &self.lemmatizer;
            self.freq
                .add_tag(&key, new_tag, |w, t| lemmatizer.lemmatize(w, t))?;
            self.touched.insert(key);
        }

        self.stats.mark_dirty();
        Ok(old_tag)
    }

    /// Manually record a tag for a word, independent of occurrences.
    pub fn add_word_tag(&mut self, word: &str, tag: Tag) -> Result<(), CorpusError> {
        let lemmatizer = &self.lemmatizer;
        self.freq.add_tag(word, tag, |w, t| lemmatizer.lemmatize(w, t))
    }

    /// Manually remove a recorded tag from a word.
    pub fn remove_word_tag(&mut self, word: &str, tag: Tag) -> Result<(), CorpusError> {
        self.freq.remove_tag(word, tag)
    }

    /// Sorted word list (optionally prefix-filtered) plus the drained
    /// modified set. Draining is intentional: each modification is reported
    /// exactly once.
    pub fn list_words(&mut self, prefix: Option<&str>) -> WordListing {
        let modified: Vec<String> = std::mem::take(&mut self.touched).into_iter().collect();
        let mut words = self.freq.words();
        if let Some(prefix) = prefix {
            words.retain(|w| w.starts_with(prefix));
        }
        WordListing { words, modified }
    }

    /// Count and recorded tags for a word key; `(0, empty)` when absent.
    pub fn word_info(&self, word: &str) -> (usize, std::collections::BTreeMap<Tag, String>) {
        self.freq.get(word)
    }

    /// Token-window context around the `ordinal`-th occurrence of `word`.
    pub fn get_context(
        &self,
        word: &str,
        ordinal: usize,
        radius: usize,
    ) -> Result<ContextHit, CorpusError> {
        let token_index = self.index.find_by_occurrence(word, ordinal).ok_or_else(|| {
            CorpusError::OccurrenceNotFound {
                word: word.to_string(),
                ordinal,
            }
        })?;
        let (lo, hi) = self.index.window(token_index, radius);
        let len = self.index.len();
        let first = self
            .index
            .get(lo)
            .ok_or(CorpusError::IndexOutOfRange { index: lo, len })?;
        let last = self
            .index
            .get(hi)
            .ok_or(CorpusError::IndexOutOfRange { index: hi, len })?;
        let target = self
            .index
            .get(token_index)
            .ok_or(CorpusError::IndexOutOfRange {
                index: token_index,
                len,
            })?;

        let text = self.buffer.slice(first.start, last.end())?.to_string();
        let match_start = target.start - first.start;
        Ok(ContextHit {
            text,
            match_start,
            match_end: match_start + target.surface.len(),
            token_index,
        })
    }

    /// Map a raw-text offset to its token, e.g. for click-to-token lookups.
    pub fn token_at_offset(&self, offset: usize) -> Option<(usize, &TaggedToken)> {
        self.index.find_by_offset(offset)
    }

    /// The three frequency tables, recomputing only if dirty.
    pub fn get_stats(&mut self) -> &CorpusStats {
        self.stats.get_or_compute(&self.index)
    }

    /// Read-only `(gap, token, display tag)` projection of one document.
    /// Out-of-set tags and pure-punctuation surfaces render as `OTHER`.
    pub fn render_annotated(
        &self,
        document_name: &str,
    ) -> Result<Vec<AnnotatedSpan>, CorpusError> {
        let doc = self
            .buffer
            .document(document_name)
            .ok_or_else(|| CorpusError::DocumentNotFound(document_name.to_string()))?;

        let mut out = Vec::new();
        let mut cursor = doc.start;
        for token in self.index.tokens() {
            if token.start < doc.start {
                continue;
            }
            if token.start >= doc.end {
                break;
            }
            let gap = self.buffer.slice(cursor, token.start)?.to_string();
            let display_tag = if token.tag.in_closed_set()
                && token.surface.chars().any(|c| c.is_alphanumeric())
            {
                token.tag
            } else {
                Tag::Other
            };
            out.push(AnnotatedSpan {
                gap,
                text: token.surface.clone(),
                tag: display_tag,
            });
            cursor = token.end();
        }
        Ok(out)
    }

    /// Serializable record of the whole engine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.buffer, &self.index, &self.freq, &self.stats)
    }

    /// Replace the in-memory state wholesale with a restored snapshot.
    /// The snapshot is validated structurally before anything is built; a
    /// corrupt record never produces a half-initialized engine.
    pub fn from_snapshot(
        snapshot: Snapshot,
        tokenizer: T,
        lemmatizer: L,
    ) -> Result<Self, CorpusError> {
        let (buffer, index, freq, stats) = snapshot.restore()?;
        Ok(Self {
            buffer,
            index,
            freq,
            stats,
            tokenizer,
            lemmatizer,
            touched: BTreeSet::new(),
        })
    }
}
