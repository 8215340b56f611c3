use corpus_types::{Tag, TaggerError};
use thiserror::Error;

/// Error taxonomy for engine operations.
///
/// Every failing operation leaves the engine in its pre-operation state;
/// there is no partial splice and no half-updated frequency table.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Byte range outside the buffer, or not on character boundaries.
    /// Indicates a caller bug or a stale offset held across a mutation.
    #[error("byte range {start}..{end} is invalid for buffer of length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },

    /// Token index outside the current token sequence.
    #[error("token index {index} is out of range (corpus has {len} tokens)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no frequency entry for word {0:?}")]
    UnknownWord(String),

    #[error("word {word:?} has no recorded tag {tag}")]
    UnknownTag { word: String, tag: Tag },

    #[error("document {0:?} not found")]
    DocumentNotFound(String),

    #[error("occurrence {ordinal} of {word:?} not found")]
    OccurrenceNotFound { word: String, ordinal: usize },

    /// Restored state failed its internal consistency checks.
    #[error("snapshot is internally inconsistent: {0}")]
    CorruptSnapshot(String),

    /// The Tokenizer/Tagger collaborator failed; the triggering operation
    /// was abandoned without mutating anything.
    #[error(transparent)]
    Tagger(#[from] TaggerError),
}
