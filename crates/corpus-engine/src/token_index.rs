//! Ordered sequence of tagged tokens covering the whole raw text buffer.
//!
//! Tokens are sorted strictly by start offset, one entry per token across
//! the corpus, punctuation included (it is excluded from frequencies but
//! kept for context and annotated rendering). The central edit primitive is
//! [`TokenIndex::splice_replace`], which swaps one token for the re-tokenized
//! replacement text and shifts every later token by the byte delta.

use corpus_types::{Tag, TaggedToken, TaggerError, TokenSpan};

use crate::errors::CorpusError;

#[derive(Clone, Debug, Default)]
pub struct TokenIndex {
    tokens: Vec<TaggedToken>,
}

/// Result of a splice-replace: the removed token, the tokens inserted in its
/// place (possibly none), and the byte delta applied to all later tokens.
///
/// Callers holding raw indices or offsets from before the edit must
/// re-resolve them using `delta` and the insertion point; the engine returns
/// this struct verbatim for that reason.
#[derive(Clone, Debug)]
pub struct SpliceOutcome {
    pub removed: TaggedToken,
    pub inserted: Vec<TaggedToken>,
    pub delta: isize,
}

impl TokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_tokens(tokens: Vec<TaggedToken>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[TaggedToken] {
        &self.tokens
    }

    pub fn get(&self, index: usize) -> Option<&TaggedToken> {
        self.tokens.get(index)
    }

    /// Append a freshly tokenized document, converting tokenizer-relative
    /// offsets into absolute buffer coordinates. The tokenizer returns spans
    /// in left-to-right order, so sortedness holds by construction.
    pub fn append_tagged(&mut self, spans: Vec<TokenSpan>, base_offset: usize) {
        self.tokens.reserve(spans.len());
        for span in spans {
            self.tokens.push(TaggedToken {
                start: base_offset + span.start,
                surface: span.surface,
                tag: span.tag,
            });
        }
    }

    /// Index of the `ordinal`-th (0-based) case-insensitive occurrence of
    /// `word`, scanning in surface order.
    pub fn find_by_occurrence(&self, word: &str, ordinal: usize) -> Option<usize> {
        let needle = word.to_lowercase();
        let mut seen = 0;
        for (i, token) in self.tokens.iter().enumerate() {
            if token.surface.to_lowercase() == needle {
                if seen == ordinal {
                    return Some(i);
                }
                seen += 1;
            }
        }
        None
    }

    /// Token whose `[start, end)` range contains `raw_offset`. Stops early
    /// once a token starts past the target.
    pub fn find_by_offset(&self, raw_offset: usize) -> Option<(usize, &TaggedToken)> {
        for (i, token) in self.tokens.iter().enumerate() {
            if token.start > raw_offset {
                break;
            }
            if raw_offset < token.end() {
                return Some((i, token));
            }
        }
        None
    }

    /// Clamp `[index - radius, index + radius]` to valid token indices.
    pub fn window(&self, index: usize, radius: usize) -> (usize, usize) {
        let lo = index.saturating_sub(radius);
        let hi = (index + radius).min(self.tokens.len().saturating_sub(1));
        (lo, hi)
    }

    /// Swap the tag of the token at `index` in place, returning the old tag.
    pub fn set_tag(&mut self, index: usize, tag: Tag) -> Result<Tag, CorpusError> {
        let len = self.tokens.len();
        let token = self
            .tokens
            .get_mut(index)
            .ok_or(CorpusError::IndexOutOfRange { index, len })?;
        let old = token.tag;
        token.tag = tag;
        Ok(old)
    }

    /// Replace the token at `index` with the re-tokenization of `new_text`,
    /// anchored at the old token's start, shifting all later tokens by the
    /// byte delta.
    ///
    /// `new_text` may tokenize into zero tokens (the old token is simply
    /// removed) or several (all inserted in order) — callers must not assume
    /// one-in, one-out. A `retag` failure aborts before any mutation.
    pub fn splice_replace<F>(
        &mut self,
        index: usize,
        new_text: &str,
        retag: F,
    ) -> Result<SpliceOutcome, CorpusError>
    where
        F: FnOnce(&str) -> Result<Vec<TokenSpan>, TaggerError>,
    {
        let len = self.tokens.len();
        let removed = self
            .tokens
            .get(index)
            .cloned()
            .ok_or(CorpusError::IndexOutOfRange { index, len })?;

        let spans = retag(new_text)?;
        let inserted: Vec<TaggedToken> = spans
            .into_iter()
            .map(|span| TaggedToken {
                start: removed.start + span.start,
                surface: span.surface,
                tag: span.tag,
            })
            .collect();

        let delta = new_text.len() as isize - removed.surface.len() as isize;
        let inserted_len = inserted.len();
        self.tokens.splice(index..=index, inserted.iter().cloned());
        for token in &mut self.tokens[index + inserted_len..] {
            token.start = (token.start as isize + delta) as usize;
        }

        Ok(SpliceOutcome {
            removed,
            inserted,
            delta,
        })
    }
}
