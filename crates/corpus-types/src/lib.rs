//! Shared leaf types for the corpus engine: the closed part-of-speech tag
//! set, tokens, tokenizer output spans, and the collaborator traits.
//!
//! The tag set mirrors the Penn Treebank inventory (36 tags) plus an
//! [`Tag::Other`] sentinel for everything outside it — punctuation, symbols,
//! and tags the engine does not recognize. Membership in the closed set
//! drives both word validity and annotated rendering.
//!
//! ```rust
//! use corpus_types::{Tag, WordClass, is_word_surface};
//!
//! let tag = Tag::from_label("NNS").unwrap();
//! assert_eq!(tag.label(), "NNS");
//! assert_eq!(WordClass::from_tag(tag), WordClass::Noun);
//! assert!(is_word_surface("mother-in-law"));
//! assert!(!is_word_surface("3.14"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed part-of-speech tag set plus the `Other` sentinel.
///
/// Labels follow the Penn Treebank conventions (`PRP$` and friends included).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Cc,
    Cd,
    Dt,
    Ex,
    Fw,
    In,
    Jj,
    Jjr,
    Jjs,
    Ls,
    Md,
    Nn,
    Nns,
    Nnp,
    Nnps,
    Pdt,
    Pos,
    Prp,
    PrpPoss,
    Rb,
    Rbr,
    Rbs,
    Rp,
    Sym,
    To,
    Uh,
    Vb,
    Vbd,
    Vbg,
    Vbn,
    Vbp,
    Vbz,
    Wdt,
    Wp,
    WpPoss,
    Wrb,
    /// Sentinel for punctuation and anything outside the closed set.
    Other,
}

/// All tags of the closed set, in label order. Excludes [`Tag::Other`].
pub const CLOSED_TAG_SET: [Tag; 36] = [
    Tag::Cc,
    Tag::Cd,
    Tag::Dt,
    Tag::Ex,
    Tag::Fw,
    Tag::In,
    Tag::Jj,
    Tag::Jjr,
    Tag::Jjs,
    Tag::Ls,
    Tag::Md,
    Tag::Nn,
    Tag::Nns,
    Tag::Nnp,
    Tag::Nnps,
    Tag::Pdt,
    Tag::Pos,
    Tag::Prp,
    Tag::PrpPoss,
    Tag::Rb,
    Tag::Rbr,
    Tag::Rbs,
    Tag::Rp,
    Tag::Sym,
    Tag::To,
    Tag::Uh,
    Tag::Vb,
    Tag::Vbd,
    Tag::Vbg,
    Tag::Vbn,
    Tag::Vbp,
    Tag::Vbz,
    Tag::Wdt,
    Tag::Wp,
    Tag::WpPoss,
    Tag::Wrb,
];

impl Tag {
    /// Parse a Treebank label (`"NN"`, `"PRP$"`, ...) into a tag.
    ///
    /// Returns `None` for labels outside the closed set; callers that want
    /// the sentinel instead can fall back to [`Tag::Other`] themselves.
    pub fn from_label(label: &str) -> Option<Self> {
        let tag = match label {
            "CC" => Tag::Cc,
            "CD" => Tag::Cd,
            "DT" => Tag::Dt,
            "EX" => Tag::Ex,
            "FW" => Tag::Fw,
            "IN" => Tag::In,
            "JJ" => Tag::Jj,
            "JJR" => Tag::Jjr,
            "JJS" => Tag::Jjs,
            "LS" => Tag::Ls,
            "MD" => Tag::Md,
            "NN" => Tag::Nn,
            "NNS" => Tag::Nns,
            "NNP" => Tag::Nnp,
            "NNPS" => Tag::Nnps,
            "PDT" => Tag::Pdt,
            "POS" => Tag::Pos,
            "PRP" => Tag::Prp,
            "PRP$" => Tag::PrpPoss,
            "RB" => Tag::Rb,
            "RBR" => Tag::Rbr,
            "RBS" => Tag::Rbs,
            "RP" => Tag::Rp,
            "SYM" => Tag::Sym,
            "TO" => Tag::To,
            "UH" => Tag::Uh,
            "VB" => Tag::Vb,
            "VBD" => Tag::Vbd,
            "VBG" => Tag::Vbg,
            "VBN" => Tag::Vbn,
            "VBP" => Tag::Vbp,
            "VBZ" => Tag::Vbz,
            "WDT" => Tag::Wdt,
            "WP" => Tag::Wp,
            "WP$" => Tag::WpPoss,
            "WRB" => Tag::Wrb,
            _ => return None,
        };
        Some(tag)
    }

    /// Emit the Treebank label for this tag (`"OTHER"` for the sentinel).
    pub fn label(self) -> &'static str {
        match self {
            Tag::Cc => "CC",
            Tag::Cd => "CD",
            Tag::Dt => "DT",
            Tag::Ex => "EX",
            Tag::Fw => "FW",
            Tag::In => "IN",
            Tag::Jj => "JJ",
            Tag::Jjr => "JJR",
            Tag::Jjs => "JJS",
            Tag::Ls => "LS",
            Tag::Md => "MD",
            Tag::Nn => "NN",
            Tag::Nns => "NNS",
            Tag::Nnp => "NNP",
            Tag::Nnps => "NNPS",
            Tag::Pdt => "PDT",
            Tag::Pos => "POS",
            Tag::Prp => "PRP",
            Tag::PrpPoss => "PRP$",
            Tag::Rb => "RB",
            Tag::Rbr => "RBR",
            Tag::Rbs => "RBS",
            Tag::Rp => "RP",
            Tag::Sym => "SYM",
            Tag::To => "TO",
            Tag::Uh => "UH",
            Tag::Vb => "VB",
            Tag::Vbd => "VBD",
            Tag::Vbg => "VBG",
            Tag::Vbn => "VBN",
            Tag::Vbp => "VBP",
            Tag::Vbz => "VBZ",
            Tag::Wdt => "WDT",
            Tag::Wp => "WP",
            Tag::WpPoss => "WP$",
            Tag::Wrb => "WRB",
            Tag::Other => "OTHER",
        }
    }

    /// Human-readable description, as shown in the tag legend.
    pub fn description(self) -> &'static str {
        match self {
            Tag::Cc => "coordinating conjunction",
            Tag::Cd => "cardinal number",
            Tag::Dt => "determiner",
            Tag::Ex => "existential there",
            Tag::Fw => "foreign word",
            Tag::In => "preposition or subordinating conjunction",
            Tag::Jj => "adjective",
            Tag::Jjr => "adjective, comparative",
            Tag::Jjs => "adjective, superlative",
            Tag::Ls => "list item marker",
            Tag::Md => "modal",
            Tag::Nn => "noun, singular or mass",
            Tag::Nns => "noun, plural",
            Tag::Nnp => "proper noun, singular",
            Tag::Nnps => "proper noun, plural",
            Tag::Pdt => "predeterminer",
            Tag::Pos => "possessive ending",
            Tag::Prp => "personal pronoun",
            Tag::PrpPoss => "possessive pronoun",
            Tag::Rb => "adverb",
            Tag::Rbr => "adverb, comparative",
            Tag::Rbs => "adverb, superlative",
            Tag::Rp => "particle",
            Tag::Sym => "symbol",
            Tag::To => "to",
            Tag::Uh => "interjection",
            Tag::Vb => "verb, base form",
            Tag::Vbd => "verb, past tense",
            Tag::Vbg => "verb, gerund or present participle",
            Tag::Vbn => "verb, past participle",
            Tag::Vbp => "verb, non-3rd person singular present",
            Tag::Vbz => "verb, 3rd person singular present",
            Tag::Wdt => "wh-determiner",
            Tag::Wp => "wh-pronoun",
            Tag::WpPoss => "possessive wh-pronoun",
            Tag::Wrb => "wh-adverb",
            Tag::Other => "punctuation or out-of-set token",
        }
    }

    /// Whether this tag belongs to the closed set (everything but `Other`).
    pub fn in_closed_set(self) -> bool {
        !matches!(self, Tag::Other)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse word-class grouping used by the lemmatizer's suffix rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WordClass {
    Noun,
    Verb,
    Adj,
    Adv,
    /// No lemmatizable class; the lemma is the surface form itself.
    None,
}

impl WordClass {
    /// Map a tag onto its lemmatizable class.
    pub fn from_tag(tag: Tag) -> Self {
        match tag {
            Tag::Nn | Tag::Nns | Tag::Nnp | Tag::Nnps => WordClass::Noun,
            Tag::Vb | Tag::Vbd | Tag::Vbg | Tag::Vbn | Tag::Vbp | Tag::Vbz | Tag::Md => {
                WordClass::Verb
            }
            Tag::Jj | Tag::Jjr | Tag::Jjs => WordClass::Adj,
            Tag::Rb | Tag::Rbr | Tag::Rbs | Tag::Wrb => WordClass::Adv,
            _ => WordClass::None,
        }
    }
}

/// One surface-form occurrence in the raw text: absolute byte offset,
/// surface string, and grammatical tag.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub start: usize,
    pub surface: String,
    pub tag: Tag,
}

impl TaggedToken {
    /// Exclusive end offset (`start + surface.len()`).
    pub fn end(&self) -> usize {
        self.start + self.surface.len()
    }
}

/// Tokenizer output: one span with offsets relative to the tokenized text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
    pub surface: String,
    pub tag: Tag,
}

/// Failure raised by a Tokenizer/Tagger collaborator.
#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("tagger rejected input at byte {offset}: {reason}")]
    Rejected { offset: usize, reason: String },
    #[error("tagger backend failed: {0}")]
    Backend(String),
}

/// Tokenizer/Tagger collaborator: split text into ordered, sentence-respecting
/// tagged spans with offsets relative to the input.
///
/// Implementations must be deterministic across calls for identical input;
/// the engine re-tokenizes edited substrings in isolation and relies on
/// getting the same spans it would have seen during a larger ingest.
pub trait Tokenizer {
    fn tokenize_and_tag(&self, text: &str) -> Result<Vec<TokenSpan>, TaggerError>;
}

/// Lemmatizer collaborator: canonical base form for a `(surface, tag)` pair,
/// falling back to the surface when the tag carries no lemmatizable class.
pub trait Lemmatizer {
    fn lemmatize(&self, surface: &str, tag: Tag) -> String;
}

/// Whether a surface form counts as a word for frequency purposes:
/// alphabetic runs joined by single internal hyphens or apostrophes.
pub fn is_word_surface(surface: &str) -> bool {
    let mut prev_alpha = false;
    let mut any = false;
    for c in surface.chars() {
        if c.is_alphabetic() {
            prev_alpha = true;
            any = true;
        } else if c == '\'' || c == '-' {
            // Separators must sit between alphabetic runs.
            if !prev_alpha {
                return false;
            }
            prev_alpha = false;
        } else {
            return false;
        }
    }
    any && prev_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_labels_round_trip() {
        for tag in CLOSED_TAG_SET {
            assert_eq!(Tag::from_label(tag.label()), Some(tag));
            assert!(tag.in_closed_set());
        }
        assert_eq!(Tag::from_label("OTHER"), None);
        assert!(!Tag::Other.in_closed_set());
    }

    #[test]
    fn word_classes_cover_open_tags() {
        assert_eq!(WordClass::from_tag(Tag::Nns), WordClass::Noun);
        assert_eq!(WordClass::from_tag(Tag::Vbg), WordClass::Verb);
        assert_eq!(WordClass::from_tag(Tag::Jjs), WordClass::Adj);
        assert_eq!(WordClass::from_tag(Tag::Rbr), WordClass::Adv);
        assert_eq!(WordClass::from_tag(Tag::Dt), WordClass::None);
        assert_eq!(WordClass::from_tag(Tag::Other), WordClass::None);
    }

    #[test]
    fn word_surface_pattern() {
        assert!(is_word_surface("cat"));
        assert!(is_word_surface("can't"));
        assert!(is_word_surface("mother-in-law"));
        assert!(is_word_surface("O'Neill"));
        assert!(!is_word_surface(""));
        assert!(!is_word_surface("'tis"));
        assert!(!is_word_surface("end-"));
        assert!(!is_word_surface("a--b"));
        assert!(!is_word_surface("3.14"));
        assert!(!is_word_surface("cat7"));
    }

    #[test]
    fn token_end_is_byte_based() {
        let token = TaggedToken {
            start: 4,
            surface: "naïve".to_string(),
            tag: Tag::Jj,
        };
        assert_eq!(token.end(), 4 + "naïve".len());
    }
}
