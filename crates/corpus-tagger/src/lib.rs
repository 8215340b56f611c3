//! Deterministic tokenizer and part-of-speech tagger.
//!
//! The tokenizer is a single left-to-right scan over `char_indices`: words
//! (alphabetic runs with single internal hyphens or apostrophes), numbers,
//! and one-character punctuation tokens, with byte offsets preserved so the
//! engine can anchor every token in the raw text. Sentence boundaries are
//! tracked during the scan; they feed the proper-noun heuristic, so a word
//! capitalized mid-sentence tags differently from one opening a sentence.
//!
//! Tagging is a closed-class lexicon followed by suffix heuristics. It is a
//! stand-in for a statistical tagger, but it is deterministic — identical
//! input always yields identical spans — which is the property the engine's
//! edit path depends on.
//!
//! ```rust
//! use corpus_tagger::EnglishTagger;
//! use corpus_types::{Tag, Tokenizer};
//!
//! let tagger = EnglishTagger::new();
//! let spans = tagger.tokenize_and_tag("The cat sat.").unwrap();
//! assert_eq!(spans.len(), 4);
//! assert_eq!(spans[0].tag, Tag::Dt);
//! assert_eq!(spans[3].surface, ".");
//! assert_eq!(spans[3].tag, Tag::Other);
//! ```

use corpus_types::{Tag, TaggerError, TokenSpan, Tokenizer};

/// Rule-based English tokenizer/tagger.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnglishTagger;

impl EnglishTagger {
    pub fn new() -> Self {
        EnglishTagger
    }
}

impl Tokenizer for EnglishTagger {
    fn tokenize_and_tag(&self, text: &str) -> Result<Vec<TokenSpan>, TaggerError> {
        let mut spans = Vec::new();
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentence_start = true;
        let mut i = 0;

        while i < chars.len() {
            let (byte_pos, ch) = chars[i];

            if ch.is_whitespace() {
                i += 1;
                continue;
            }

            if ch.is_alphabetic() {
                let (end_idx, end_byte) = scan_word(&chars, i, text.len());
                let surface = &text[byte_pos..end_byte];
                let tag = tag_word(surface, sentence_start);
                spans.push(TokenSpan {
                    start: byte_pos,
                    end: end_byte,
                    surface: surface.to_string(),
                    tag,
                });
                sentence_start = false;
                i = end_idx;
                continue;
            }

            if ch.is_ascii_digit() {
                let (end_idx, end_byte) = scan_number(&chars, i, text.len());
                spans.push(TokenSpan {
                    start: byte_pos,
                    end: end_byte,
                    surface: text[byte_pos..end_byte].to_string(),
                    tag: Tag::Cd,
                });
                sentence_start = false;
                i = end_idx;
                continue;
            }

            // Everything else is a one-character token.
            let end_byte = chars.get(i + 1).map(|(b, _)| *b).unwrap_or(text.len());
            let tag = match ch {
                '$' | '%' | '#' | '+' | '=' | '<' | '>' | '^' | '~' => Tag::Sym,
                _ => Tag::Other,
            };
            spans.push(TokenSpan {
                start: byte_pos,
                end: end_byte,
                surface: text[byte_pos..end_byte].to_string(),
                tag,
            });
            if matches!(ch, '.' | '!' | '?') {
                sentence_start = true;
            }
            i += 1;
        }

        Ok(spans)
    }
}

/// Consume a word starting at `chars[start]`: alphabetic characters, with a
/// single `'` or `-` allowed when flanked by alphabetic characters.
fn scan_word(chars: &[(usize, char)], start: usize, text_len: usize) -> (usize, usize) {
    let mut i = start;
    while i < chars.len() {
        let (_, ch) = chars[i];
        if ch.is_alphabetic() {
            i += 1;
        } else if (ch == '\'' || ch == '-')
            && i > start
            && chars
                .get(i + 1)
                .map(|(_, next)| next.is_alphabetic())
                .unwrap_or(false)
        {
            i += 1;
        } else {
            break;
        }
    }
    let end_byte = chars.get(i).map(|(b, _)| *b).unwrap_or(text_len);
    (i, end_byte)
}

/// Consume a number: digits with internal `.` or `,` between digits.
fn scan_number(chars: &[(usize, char)], start: usize, text_len: usize) -> (usize, usize) {
    let mut i = start;
    while i < chars.len() {
        let (_, ch) = chars[i];
        if ch.is_ascii_digit() {
            i += 1;
        } else if (ch == '.' || ch == ',')
            && chars
                .get(i + 1)
                .map(|(_, next)| next.is_ascii_digit())
                .unwrap_or(false)
        {
            i += 1;
        } else {
            break;
        }
    }
    let end_byte = chars.get(i).map(|(b, _)| *b).unwrap_or(text_len);
    (i, end_byte)
}

fn tag_word(surface: &str, sentence_start: bool) -> Tag {
    let lower = surface.to_lowercase();
    if let Some(tag) = lexicon_tag(&lower) {
        return tag;
    }

    let capitalized = surface.chars().next().is_some_and(|c| c.is_uppercase());
    if capitalized && !sentence_start {
        return if lower.ends_with('s') && !lower.ends_with("ss") && surface.len() > 3 {
            Tag::Nnps
        } else {
            Tag::Nnp
        };
    }

    suffix_tag(&lower)
}

/// Closed-class lexicon. First match wins over every heuristic.
fn lexicon_tag(lower: &str) -> Option<Tag> {
    let tag = match lower {
        "the" | "a" | "an" | "this" | "that" | "these" | "those" | "each" | "every" | "some"
        | "any" | "no" | "another" => Tag::Dt,
        "and" | "or" | "but" | "nor" | "yet" | "so" => Tag::Cc,
        "in" | "on" | "at" | "by" | "for" | "with" | "from" | "into" | "of" | "about"
        | "over" | "under" | "after" | "before" | "between" | "through" | "during"
        | "against" | "without" | "because" | "if" | "while" | "although" | "though"
        | "since" | "until" | "unless" => Tag::In,
        "i" | "you" | "he" | "she" | "it" | "we" | "they" | "me" | "him" | "her" | "us"
        | "them" | "myself" | "himself" | "herself" | "itself" | "themselves" => Tag::Prp,
        "my" | "your" | "his" | "its" | "our" | "their" | "hers" | "ours" | "theirs" => {
            Tag::PrpPoss
        }
        "can" | "cannot" | "could" | "will" | "would" | "shall" | "should" | "may" | "might"
        | "must" => Tag::Md,
        "to" => Tag::To,
        "not" | "never" | "always" | "often" | "very" | "too" | "also" | "here" | "there"
        | "now" | "then" | "again" | "soon" | "quite" | "rather" => Tag::Rb,
        "which" | "whatever" | "whichever" => Tag::Wdt,
        "who" | "whom" | "what" => Tag::Wp,
        "whose" => Tag::WpPoss,
        "when" | "where" | "why" | "how" => Tag::Wrb,
        "all" | "both" | "half" => Tag::Pdt,
        "oh" | "ah" | "wow" | "alas" | "hey" | "yes" | "no-no" => Tag::Uh,
        "is" | "are" | "was" | "were" | "be" | "been" | "being" | "am" => match lower {
            "is" => Tag::Vbz,
            "are" | "am" => Tag::Vbp,
            "was" | "were" => Tag::Vbd,
            "been" => Tag::Vbn,
            "being" => Tag::Vbg,
            _ => Tag::Vb,
        },
        "has" | "does" => Tag::Vbz,
        "have" | "do" => Tag::Vbp,
        "had" | "did" => Tag::Vbd,
        _ => return None,
    };
    Some(tag)
}

/// Suffix heuristics applied to lowercase surfaces outside the lexicon.
fn suffix_tag(lower: &str) -> Tag {
    let n = lower.len();
    if n > 3 && lower.ends_with("ly") {
        return Tag::Rb;
    }
    if n > 4 && lower.ends_with("ing") {
        return Tag::Vbg;
    }
    if n > 3 && lower.ends_with("ed") {
        return Tag::Vbd;
    }
    if n > 4 && lower.ends_with("est") {
        return Tag::Jjs;
    }
    if n > 3
        && (lower.ends_with("ous")
            || lower.ends_with("ful")
            || lower.ends_with("ive")
            || lower.ends_with("able")
            || lower.ends_with("ible")
            || lower.ends_with("ic"))
    {
        return Tag::Jj;
    }
    if n > 4
        && (lower.ends_with("tion")
            || lower.ends_with("ment")
            || lower.ends_with("ness")
            || lower.ends_with("ity"))
    {
        return Tag::Nn;
    }
    if n > 2 && lower.ends_with('s') && !lower.ends_with("ss") {
        return Tag::Nns;
    }
    Tag::Nn
}
