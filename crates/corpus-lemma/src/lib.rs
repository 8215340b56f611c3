//! Rule-based lemmatization keyed by part-of-speech tag.
//!
//! The algorithm is the classic one: check an exception list first, then
//! strip a tag-driven suffix and repair the stem, and fall back to the
//! surface form when nothing applies or the tag carries no lemmatizable
//! word class. Exception lists are optional `*.exc`-style files (one
//! `surface lemma` pair per line) loaded from a directory; a missing file
//! is treated as empty.
//!
//! Unlike a dictionary-backed lemmatizer there is no existence check for
//! candidates. Suffix rules carry a minimum stem length, and stem repair
//! handles the two common inflection artifacts: doubled final consonants
//! ("running" -> "run") and a dropped final `e` on short stems
//! ("making" -> "make").
//!
//! # Example
//! ```rust
//! use corpus_lemma::RuleLemmatizer;
//! use corpus_types::{Lemmatizer, Tag};
//!
//! let lemma = RuleLemmatizer::new();
//! assert_eq!(lemma.lemmatize("cats", Tag::Nns), "cat");
//! assert_eq!(lemma.lemmatize("running", Tag::Vbg), "run");
//! assert_eq!(lemma.lemmatize("the", Tag::Dt), "the");
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corpus_types::{Lemmatizer, Tag, WordClass};

/// Lemmatizer backed by suffix rules and optional exception lists.
#[derive(Debug, Default)]
pub struct RuleLemmatizer {
    exceptions: HashMap<WordClass, HashMap<String, String>>,
}

impl RuleLemmatizer {
    /// Rules only, no exception lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load exception lists (`noun.exc`, `verb.exc`, `adj.exc`, `adv.exc`)
    /// from a directory. Files are optional; missing ones are treated as
    /// empty.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            exceptions: HashMap::from([
                (WordClass::Noun, load_exc(dir.join("noun.exc"))?),
                (WordClass::Verb, load_exc(dir.join("verb.exc"))?),
                (WordClass::Adj, load_exc(dir.join("adj.exc"))?),
                (WordClass::Adv, load_exc(dir.join("adv.exc"))?),
            ]),
        })
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemmatize(&self, surface: &str, tag: Tag) -> String {
        let class = WordClass::from_tag(tag);
        if matches!(class, WordClass::None) {
            return surface.to_string();
        }

        let lower = surface.to_lowercase();
        if let Some(exc) = self.exceptions.get(&class)
            && let Some(lemma) = exc.get(&lower)
        {
            return lemma.clone();
        }

        match tag {
            Tag::Nns | Tag::Nnps => plural_noun(&lower),
            Tag::Vbd | Tag::Vbn => strip_and_repair(&lower, &[("ied", "y"), ("ed", "")]),
            Tag::Vbg => strip_and_repair(&lower, &[("ing", "")]),
            Tag::Vbz => strip_and_repair(&lower, &[("ies", "y"), ("es", ""), ("s", "")]),
            Tag::Jjr | Tag::Rbr => strip_and_repair(&lower, &[("ier", "y"), ("er", "")]),
            Tag::Jjs | Tag::Rbs => strip_and_repair(&lower, &[("iest", "y"), ("est", "")]),
            _ => lower,
        }
    }
}

const MIN_STEM: usize = 2;

fn plural_noun(lower: &str) -> String {
    for (suffix, replacement) in [
        ("ches", "ch"),
        ("shes", "sh"),
        ("xes", "x"),
        ("zes", "z"),
        ("sses", "ss"),
        ("ies", "y"),
        ("men", "man"),
        ("s", ""),
    ] {
        if let Some(stem) = lower.strip_suffix(suffix)
            && stem.chars().count() >= MIN_STEM
        {
            return format!("{stem}{replacement}");
        }
    }
    lower.to_string()
}

/// Strip the first matching suffix and repair the stem. Rules with a
/// non-empty replacement rewrite directly; bare strips go through
/// [`repair_stem`].
fn strip_and_repair(lower: &str, rules: &[(&str, &str)]) -> String {
    for (suffix, replacement) in rules {
        if let Some(stem) = lower.strip_suffix(suffix) {
            if stem.chars().count() < MIN_STEM {
                continue;
            }
            if replacement.is_empty() {
                return repair_stem(stem);
            }
            return format!("{stem}{replacement}");
        }
    }
    lower.to_string()
}

/// Undo the two common inflection artifacts on a bare stripped stem:
/// doubled final consonants ("runn" -> "run", but "tell", "pass" keep
/// theirs) and a dropped `e` on three-letter consonant-vowel-consonant
/// stems ("mak" -> "make").
fn repair_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    if n >= 3 {
        let last = chars[n - 1];
        let prev = chars[n - 2];
        if last == prev && is_consonant(last) && !matches!(last, 'l' | 's' | 'z') {
            return chars[..n - 1].iter().collect();
        }
        if n == 3
            && is_consonant(last)
            && !matches!(last, 'w' | 'x' | 'y')
            && !is_consonant(prev)
            && is_consonant(chars[0])
        {
            return format!("{stem}e");
        }
    }
    stem.to_string()
}

fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn load_exc(path: PathBuf) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file =
        File::open(&path).with_context(|| format!("open exception file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let mut parts = line.split_whitespace();
        let (Some(surface), Some(lemma)) = (parts.next(), parts.next()) else {
            continue;
        };
        map.insert(surface.to_lowercase(), lemma.to_lowercase());
    }
    Ok(map)
}
