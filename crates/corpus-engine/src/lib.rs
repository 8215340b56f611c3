//! In-memory corpus index and mutation engine.
//!
//! The engine keeps four structures in lockstep over a growing collection of
//! plain-text documents: the concatenated raw text ([`RawTextBuffer`]), the
//! ordered tagged-token sequence ([`TokenIndex`]), the word frequency and tag
//! table ([`FrequencyTagTable`]), and lazily recomputed corpus statistics
//! ([`StatsAggregator`]). [`CorpusEngine`] is the façade that routes every
//! operation through all four so offsets, counts, and caches never drift.
//!
//! Tokenization and lemmatization are pluggable through the
//! [`Tokenizer`](corpus_types::Tokenizer) and
//! [`Lemmatizer`](corpus_types::Lemmatizer) traits; the engine never guesses
//! tags or lemmas itself.
//!
//! # Example
//! ```no_run
//! use corpus_engine::CorpusEngine;
//! use corpus_lemma::RuleLemmatizer;
//! use corpus_tagger::EnglishTagger;
//!
//! # fn main() -> Result<(), corpus_engine::CorpusError> {
//! let mut engine = CorpusEngine::new(EnglishTagger::new(), RuleLemmatizer::new());
//! let report = engine.ingest("pets.txt", "The cat sat. The dog ran.")?;
//! println!("{} tokens", report.token_count);
//!
//! let stats = engine.get_stats();
//! println!("{} distinct tags", stats.tag_freq.len());
//! # Ok(()) }
//! ```

mod engine;
mod errors;
mod freq_table;
mod raw_text;
mod snapshot;
mod stats;
mod token_index;

pub use engine::{
    AnnotatedSpan, ContextHit, CorpusEngine, DEFAULT_CONTEXT_RADIUS, IngestReport,
    PreparedDocument, WordListing,
};
pub use errors::CorpusError;
pub use freq_table::{FrequencyTagTable, WordEntry};
pub use raw_text::{DOCUMENT_SEPARATOR, DocSpan, RawTextBuffer, normalize_text};
pub use snapshot::{LemmaRecord, Snapshot, StatsRecord, TagLemma, WordRecord};
pub use stats::{CorpusStats, StatsAggregator};
pub use token_index::{SpliceOutcome, TokenIndex};
