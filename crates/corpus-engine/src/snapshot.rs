//! Whole-state snapshot for persistence.
//!
//! The snapshot is a plain serde struct so the service layer can write it as
//! JSON. Tuple-keyed maps (lemma memo, stats tables) are flattened into
//! record vectors because JSON object keys must be strings. `restore`
//! validates the record against the structural invariants before building
//! anything, so a corrupt file never yields a half-valid engine.

use serde::{Deserialize, Serialize};

use corpus_types::{Tag, TaggedToken};

use crate::errors::CorpusError;
use crate::freq_table::{FrequencyTagTable, WordEntry};
use crate::raw_text::{DocSpan, RawTextBuffer};
use crate::stats::{CorpusStats, StatsAggregator};
use crate::token_index::TokenIndex;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub raw_text: String,
    pub documents: Vec<DocSpan>,
    pub tokens: Vec<TaggedToken>,
    pub words: Vec<WordRecord>,
    pub lemma_memo: Vec<LemmaRecord>,
    pub stats: Option<StatsRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub count: usize,
    pub tags: Vec<TagLemma>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagLemma {
    pub tag: Tag,
    pub lemma: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LemmaRecord {
    pub word: String,
    pub tag: Tag,
    pub lemma: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsRecord {
    pub tag_freq: Vec<(Tag, usize)>,
    pub word_tag_freq: Vec<(String, Tag, usize)>,
    pub tag_bigram_freq: Vec<(Tag, Tag, usize)>,
}

impl Snapshot {
    /// Flatten live engine state into a serializable record. Record vectors
    /// are sorted so equal states serialize identically.
    pub(crate) fn capture(
        buffer: &RawTextBuffer,
        index: &TokenIndex,
        freq: &FrequencyTagTable,
        stats: &StatsAggregator,
    ) -> Self {
        let (entries, memo) = freq.parts();

        let mut words: Vec<WordRecord> = entries
            .iter()
            .map(|(word, entry)| WordRecord {
                word: word.clone(),
                count: entry.count,
                tags: entry
                    .tags
                    .iter()
                    .map(|(tag, lemma)| TagLemma {
                        tag: *tag,
                        lemma: lemma.clone(),
                    })
                    .collect(),
            })
            .collect();
        words.sort_by(|a, b| a.word.cmp(&b.word));

        let mut lemma_memo: Vec<LemmaRecord> = memo
            .iter()
            .map(|((word, tag), lemma)| LemmaRecord {
                word: word.clone(),
                tag: *tag,
                lemma: lemma.clone(),
            })
            .collect();
        lemma_memo.sort_by(|a, b| (&a.word, a.tag).cmp(&(&b.word, b.tag)));

        let stats = stats.cached().map(|s| {
            let mut record = StatsRecord {
                tag_freq: s.tag_freq.iter().map(|(t, n)| (*t, *n)).collect(),
                word_tag_freq: s
                    .word_tag_freq
                    .iter()
                    .map(|((w, t), n)| (w.clone(), *t, *n))
                    .collect(),
                tag_bigram_freq: s.tag_bigram_freq.iter().map(|(p, n)| (p.0, p.1, *n)).collect(),
            };
            record.tag_freq.sort();
            record.word_tag_freq.sort();
            record.tag_bigram_freq.sort();
            record
        });

        Self {
            raw_text: buffer.text().to_string(),
            documents: buffer.documents().to_vec(),
            tokens: index.tokens().to_vec(),
            words,
            lemma_memo,
            stats,
        }
    }

    /// Validate and rebuild the four engine components. Any structural
    /// violation fails the whole restore with [`CorpusError::CorruptSnapshot`].
    pub(crate) fn restore(
        self,
    ) -> Result<(RawTextBuffer, TokenIndex, FrequencyTagTable, StatsAggregator), CorpusError> {
        self.validate()?;

        let buffer = RawTextBuffer::from_parts(self.raw_text, self.documents);
        let index = TokenIndex::from_tokens(self.tokens);

        let entries = self
            .words
            .into_iter()
            .map(|record| {
                let entry = WordEntry {
                    count: record.count,
                    tags: record
                        .tags
                        .into_iter()
                        .map(|tl| (tl.tag, tl.lemma))
                        .collect(),
                };
                (record.word, entry)
            })
            .collect();
        let memo = self
            .lemma_memo
            .into_iter()
            .map(|record| ((record.word, record.tag), record.lemma))
            .collect();
        let freq = FrequencyTagTable::from_parts(entries, memo);

        let stats = StatsAggregator::with_cache(self.stats.map(|record| CorpusStats {
            tag_freq: record.tag_freq.into_iter().collect(),
            word_tag_freq: record
                .word_tag_freq
                .into_iter()
                .map(|(w, t, n)| ((w, t), n))
                .collect(),
            tag_bigram_freq: record
                .tag_bigram_freq
                .into_iter()
                .map(|(a, b, n)| ((a, b), n))
                .collect(),
        }));

        Ok((buffer, index, freq, stats))
    }

    fn validate(&self) -> Result<(), CorpusError> {
        let corrupt = |msg: String| Err(CorpusError::CorruptSnapshot(msg));
        let text = &self.raw_text;

        let mut prev_end = 0;
        for doc in &self.documents {
            if doc.start > doc.end || doc.end > text.len() {
                return corrupt(format!("document {:?} span out of bounds", doc.name));
            }
            if doc.start < prev_end {
                return corrupt(format!("document {:?} overlaps its predecessor", doc.name));
            }
            if !text.is_char_boundary(doc.start) || !text.is_char_boundary(doc.end) {
                return corrupt(format!("document {:?} splits a character", doc.name));
            }
            prev_end = doc.end;
        }

        let mut prev_start = None;
        for (i, token) in self.tokens.iter().enumerate() {
            let end = token.end();
            if end > text.len()
                || !text.is_char_boundary(token.start)
                || !text.is_char_boundary(end)
            {
                return corrupt(format!("token {i} span out of bounds"));
            }
            if text[token.start..end] != token.surface {
                return corrupt(format!(
                    "token {i} surface {:?} does not match the raw text",
                    token.surface
                ));
            }
            if prev_start.is_some_and(|prev| token.start <= prev) {
                return corrupt(format!("token {i} breaks start-offset ordering"));
            }
            prev_start = Some(token.start);
        }

        let mut prev_word: Option<&str> = None;
        for record in &self.words {
            if record.count == 0 {
                return corrupt(format!("word {:?} has a zero count", record.word));
            }
            if prev_word.is_some_and(|prev| record.word.as_str() <= prev) {
                return corrupt(format!("word {:?} is duplicated or unsorted", record.word));
            }
            prev_word = Some(&record.word);
        }

        Ok(())
    }
}
