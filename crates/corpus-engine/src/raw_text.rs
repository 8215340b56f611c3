//! Concatenated raw text of all ingested documents plus named document
//! spans, with append and in-place splice-with-offset-shift.

use serde::{Deserialize, Serialize};

use crate::errors::CorpusError;

/// Marker inserted between appended documents.
pub const DOCUMENT_SEPARATOR: &str = "\n\n**\n\n";

/// Named `[start, end)` byte span of one document inside the buffer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DocSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Append-only-by-default text buffer with a document span registry.
///
/// Spans are pairwise non-overlapping and sorted by start. The buffer is
/// mutated in place only through [`RawTextBuffer::splice`], which keeps the
/// span table consistent with the text in one step.
#[derive(Clone, Debug, Default)]
pub struct RawTextBuffer {
    text: String,
    docs: Vec<DocSpan>,
}

/// Unify typographic quotes and dashes so tokenization and display see one
/// representation. Applied by the engine before tokenizing and appending.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("''", "\"");
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

impl RawTextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(text: String, docs: Vec<DocSpan>) -> Self {
        Self { text, docs }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn documents(&self) -> &[DocSpan] {
        &self.docs
    }

    pub fn document(&self, name: &str) -> Option<&DocSpan> {
        self.docs.iter().find(|d| d.name == name)
    }

    /// Append `separator + text` and register the span under a deduplicated
    /// name (`name (2)`, `name (3)`, ... when the name repeats). Duplicates
    /// are renamed, never rejected. The caller passes already-normalized
    /// text and uses the returned span's `start` as the base offset when
    /// registering tokens.
    pub fn append_document(&mut self, name: &str, text: &str) -> DocSpan {
        let name = self.dedup_name(name);
        self.text.push_str(DOCUMENT_SEPARATOR);
        let start = self.text.len();
        self.text.push_str(text);
        let span = DocSpan {
            name,
            start,
            end: self.text.len(),
        };
        self.docs.push(span.clone());
        span
    }

    /// Replace `text[start..start + old_len]` with `new_text`, shifting every
    /// span at or beyond the splice point by the length delta and adjusting
    /// the owning document's `end`. Bounds and character boundaries are
    /// checked before any mutation, so a failed splice changes nothing.
    pub fn splice(
        &mut self,
        start: usize,
        old_len: usize,
        new_text: &str,
    ) -> Result<isize, CorpusError> {
        let end = start + old_len;
        if end > self.text.len()
            || !self.text.is_char_boundary(start)
            || !self.text.is_char_boundary(end)
        {
            return Err(CorpusError::OutOfRange {
                start,
                end,
                len: self.text.len(),
            });
        }

        let delta = new_text.len() as isize - old_len as isize;
        self.text.replace_range(start..end, new_text);

        let shift = |v: usize| (v as isize + delta) as usize;
        let mut owner_seen = false;
        for doc in &mut self.docs {
            if !owner_seen && doc.start <= start && end <= doc.end {
                doc.end = shift(doc.end);
                owner_seen = true;
            } else if doc.start >= start {
                doc.start = shift(doc.start);
                doc.end = shift(doc.end);
            }
        }

        Ok(delta)
    }

    /// Bounds-checked read of `text[start..end]`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&str, CorpusError> {
        if start > end
            || end > self.text.len()
            || !self.text.is_char_boundary(start)
            || !self.text.is_char_boundary(end)
        {
            return Err(CorpusError::OutOfRange {
                start,
                end,
                len: self.text.len(),
            });
        }
        Ok(&self.text[start..end])
    }

    fn dedup_name(&self, name: &str) -> String {
        if self.document(name).is_none() {
            return name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{name} ({n})");
            if self.document(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_unifies_quotes_and_dashes() {
        assert_eq!(normalize_text("it\u{2019}s"), "it's");
        assert_eq!(normalize_text("''quoted''"), "\"quoted\"");
        assert_eq!(normalize_text("a \u{2014} b"), "a - b");
        assert_eq!(normalize_text("plain"), "plain");
    }

    #[test]
    fn append_registers_spans_after_the_separator() {
        let mut buf = RawTextBuffer::new();
        let a = buf.append_document("a.txt", "first");
        let b = buf.append_document("b.txt", "second");
        assert_eq!(&buf.text()[a.start..a.end], "first");
        assert_eq!(&buf.text()[b.start..b.end], "second");
        assert!(a.end <= b.start);
    }

    #[test]
    fn duplicate_names_get_numbered_suffixes() {
        let mut buf = RawTextBuffer::new();
        assert_eq!(buf.append_document("doc", "x").name, "doc");
        assert_eq!(buf.append_document("doc", "y").name, "doc (2)");
        assert_eq!(buf.append_document("doc", "z").name, "doc (3)");
        assert_eq!(buf.documents().len(), 3);
    }

    #[test]
    fn splice_shifts_owning_and_later_spans() {
        let mut buf = RawTextBuffer::new();
        let a = buf.append_document("a", "the cat sat");
        let b = buf.append_document("b", "the end");

        // "cat" -> "tiger" inside document a.
        let cat = a.start + 4;
        let delta = buf.splice(cat, 3, "tiger").unwrap();
        assert_eq!(delta, 2);

        let a2 = buf.document("a").unwrap();
        let b2 = buf.document("b").unwrap();
        assert_eq!(&buf.text()[a2.start..a2.end], "the tiger sat");
        assert_eq!(a2.start, a.start);
        assert_eq!(a2.end, a.end + 2);
        assert_eq!(b2.start, b.start + 2);
        assert_eq!(&buf.text()[b2.start..b2.end], "the end");
    }

    #[test]
    fn splice_at_document_start_keeps_the_owner_anchored() {
        let mut buf = RawTextBuffer::new();
        let a = buf.append_document("a", "cat nap");
        buf.splice(a.start, 3, "kitten").unwrap();
        let a2 = buf.document("a").unwrap();
        assert_eq!(a2.start, a.start);
        assert_eq!(&buf.text()[a2.start..a2.end], "kitten nap");
    }

    #[test]
    fn failed_splice_mutates_nothing() {
        let mut buf = RawTextBuffer::new();
        buf.append_document("a", "short");
        let before = buf.text().to_string();
        let spans = buf.documents().to_vec();
        assert!(matches!(
            buf.splice(buf.len(), 10, "x"),
            Err(CorpusError::OutOfRange { .. })
        ));
        assert_eq!(buf.text(), before);
        assert_eq!(buf.documents(), &spans[..]);
    }

    #[test]
    fn slice_checks_bounds() {
        let mut buf = RawTextBuffer::new();
        let a = buf.append_document("a", "hello");
        assert_eq!(buf.slice(a.start, a.end).unwrap(), "hello");
        assert!(buf.slice(a.start, buf.len() + 1).is_err());
        assert!(buf.slice(3, 2).is_err());
    }

    #[test]
    fn spans_stay_disjoint_and_in_bounds() {
        let mut buf = RawTextBuffer::new();
        buf.append_document("a", "one two");
        buf.append_document("b", "three");
        buf.splice(buf.document("a").unwrap().start, 3, "1").unwrap();

        let docs = buf.documents();
        for pair in docs.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for doc in docs {
            assert!(doc.end <= buf.len());
        }
    }
}
