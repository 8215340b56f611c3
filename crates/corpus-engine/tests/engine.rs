use std::cell::Cell;
use std::rc::Rc;

use corpus_engine::{CorpusEngine, CorpusError};
use corpus_lemma::RuleLemmatizer;
use corpus_tagger::EnglishTagger;
use corpus_types::{Tag, TaggerError, TokenSpan, Tokenizer};

fn engine() -> CorpusEngine<EnglishTagger, RuleLemmatizer> {
    CorpusEngine::new(EnglishTagger::new(), RuleLemmatizer::new())
}

/// Delegates to the real tagger until `fail` is flipped, then errors.
struct FlakyTagger {
    inner: EnglishTagger,
    fail: Rc<Cell<bool>>,
}

impl Tokenizer for FlakyTagger {
    fn tokenize_and_tag(&self, text: &str) -> Result<Vec<TokenSpan>, TaggerError> {
        if self.fail.get() {
            return Err(TaggerError::Backend("tagger offline".to_string()));
        }
        self.inner.tokenize_and_tag(text)
    }
}

/// Every token's recorded span must read back its own surface. This is the
/// consistency check that catches any offset drift after edits.
fn assert_offsets_consistent(engine: &CorpusEngine<impl Tokenizer, impl corpus_types::Lemmatizer>) {
    for token in engine.index().tokens() {
        let slice = engine
            .buffer()
            .slice(token.start, token.end())
            .expect("token span in bounds");
        assert_eq!(slice, token.surface, "token at {} drifted", token.start);
    }
}

#[test]
fn ingest_counts_words_and_indexes_tokens() {
    let mut eng = engine();
    let report = eng.ingest("pets.txt", "the cat sat. the dog ran.").unwrap();

    assert_eq!(report.document.name, "pets.txt");
    // 6 words + 2 sentence periods.
    assert_eq!(report.token_count, 8);
    assert_eq!(report.word_count, 6);

    assert_eq!(eng.word_info("the").0, 2);
    assert_eq!(eng.word_info("cat").0, 1);
    // Punctuation never reaches the frequency table.
    assert_eq!(eng.word_info(".").0, 0);
    assert_offsets_consistent(&eng);
}

#[test]
fn list_words_drains_the_modified_set() {
    let mut eng = engine();
    eng.ingest("a.txt", "zebra ant").unwrap();

    let listing = eng.list_words(None);
    assert_eq!(listing.words, vec!["ant", "zebra"]);
    assert_eq!(listing.modified, vec!["ant", "zebra"]);

    // Modifications are reported exactly once.
    let listing = eng.list_words(None);
    assert_eq!(listing.words, vec!["ant", "zebra"]);
    assert!(listing.modified.is_empty());
}

#[test]
fn list_words_filters_by_prefix() {
    let mut eng = engine();
    eng.ingest("a.txt", "cart cat dog").unwrap();
    let listing = eng.list_words(Some("ca"));
    assert_eq!(listing.words, vec!["cart", "cat"]);
}

#[test]
fn replace_token_fans_out_and_shifts_offsets() {
    let mut eng = engine();
    eng.ingest("a.txt", "I cannot do that now.").unwrap();
    let index = eng.index().find_by_occurrence("cannot", 0).unwrap();

    let outcome = eng.replace_token(index, "can not").unwrap();
    assert_eq!(outcome.removed.surface, "cannot");
    assert_eq!(outcome.inserted.len(), 2);
    assert_eq!(outcome.delta, 1);

    assert!(eng.buffer().text().contains("I can not do that now."));
    assert_eq!(eng.word_info("cannot").0, 0);
    assert_eq!(eng.word_info("can").0, 1);
    assert_eq!(eng.word_info("not").0, 1);
    assert_offsets_consistent(&eng);
}

#[test]
fn replace_token_with_identical_text_changes_nothing_observable() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat sat.").unwrap();
    let before_text = eng.buffer().text().to_string();
    let before_count = eng.word_info("cat").0;

    let index = eng.index().find_by_occurrence("cat", 0).unwrap();
    let outcome = eng.replace_token(index, "cat").unwrap();
    assert_eq!(outcome.delta, 0);
    assert_eq!(eng.buffer().text(), before_text);
    assert_eq!(eng.word_info("cat").0, before_count);
    assert_offsets_consistent(&eng);
}

#[test]
fn case_folding_is_order_dependent_through_ingestion() {
    // Lowercase entry first: the capitalized occurrence folds in.
    let mut eng = engine();
    eng.ingest("a.txt", "apple pie. Apple pie.").unwrap();
    assert_eq!(eng.word_info("apple").0, 2);
    assert_eq!(eng.word_info("Apple").0, 0);

    // Capitalized occurrence first keeps its own entry. The document-initial
    // "Apple" counts as sentence-initial, so it is not forced to proper noun.
    let mut eng = engine();
    eng.ingest("a.txt", "Pies with Apple. apple pie.").unwrap();
    assert_eq!(eng.word_info("Apple").0, 1);
    assert_eq!(eng.word_info("apple").0, 1);
}

#[test]
fn editing_a_capitalized_token_decrements_its_own_entry() {
    let mut eng = engine();
    eng.ingest("a.txt", "Pies with Apple. apple pie.").unwrap();
    assert_eq!(eng.word_info("Apple").0, 1);
    assert_eq!(eng.word_info("apple").0, 1);

    // The first case-insensitive match is the capitalized token. Replacing
    // it must remove the "Apple" entry and leave "apple" alone, even though
    // a lowercase entry now exists for the fold to hit.
    let index = eng.index().find_by_occurrence("apple", 0).unwrap();
    assert_eq!(eng.index().get(index).unwrap().surface, "Apple");
    eng.replace_token(index, "orange").unwrap();

    assert_eq!(eng.word_info("Apple").0, 0);
    assert_eq!(eng.word_info("apple").0, 1);
    assert_eq!(eng.word_info("orange").0, 1);
    assert_offsets_consistent(&eng);
}

#[test]
fn replace_tag_updates_the_recorded_tag_set() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat sat.").unwrap();
    let index = eng.index().find_by_occurrence("cat", 0).unwrap();

    let old = eng.replace_tag(index, Tag::Vb).unwrap();
    assert_eq!(old, Tag::Nn);
    assert_eq!(eng.index().get(index).unwrap().tag, Tag::Vb);

    let (_, tags) = eng.word_info("cat");
    assert!(tags.contains_key(&Tag::Vb));
    assert!(!tags.contains_key(&Tag::Nn));
}

#[test]
fn replace_tag_rejects_stale_indices() {
    let mut eng = engine();
    eng.ingest("a.txt", "cat").unwrap();
    assert!(matches!(
        eng.replace_tag(99, Tag::Vb),
        Err(CorpusError::IndexOutOfRange { index: 99, .. })
    ));
}

#[test]
fn stats_are_cached_until_a_mutation() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat sat. the dog ran.").unwrap();

    let first = eng.get_stats().clone();
    let second = eng.get_stats().clone();
    assert_eq!(first, second);
    assert_eq!(eng.stats_recompute_count(), 1);
    assert_eq!(first.tag_freq[&Tag::Dt], 2);
    assert_eq!(first.word_tag_freq[&("the".to_string(), Tag::Dt)], 2);

    let index = eng.index().find_by_occurrence("cat", 0).unwrap();
    eng.replace_tag(index, Tag::Vb).unwrap();
    let third = eng.get_stats().clone();
    assert_eq!(eng.stats_recompute_count(), 2);
    assert_eq!(third.tag_freq[&Tag::Vb], 1);
}

#[test]
fn tagger_failure_aborts_with_zero_mutation() {
    let fail = Rc::new(Cell::new(false));
    let tagger = FlakyTagger {
        inner: EnglishTagger::new(),
        fail: Rc::clone(&fail),
    };
    let mut eng = CorpusEngine::new(tagger, RuleLemmatizer::new());
    eng.ingest("a.txt", "the cat sat.").unwrap();

    let text_before = eng.buffer().text().to_string();
    let tokens_before = eng.index().tokens().to_vec();
    let words_before = eng.frequency().words();

    fail.set(true);
    let index = eng.index().find_by_occurrence("cat", 0).unwrap();
    assert!(matches!(
        eng.replace_token(index, "tiger"),
        Err(CorpusError::Tagger(TaggerError::Backend(_)))
    ));
    assert!(matches!(
        eng.ingest("b.txt", "more text"),
        Err(CorpusError::Tagger(_))
    ));

    assert_eq!(eng.buffer().text(), text_before);
    assert_eq!(eng.index().tokens(), &tokens_before[..]);
    assert_eq!(eng.frequency().words(), words_before);
}

#[test]
fn duplicate_document_names_are_renamed() {
    let mut eng = engine();
    let a = eng.ingest("notes", "one").unwrap();
    let b = eng.ingest("notes", "two").unwrap();
    assert_eq!(a.document.name, "notes");
    assert_eq!(b.document.name, "notes (2)");
    assert_eq!(eng.buffer().documents().len(), 2);
}

#[test]
fn context_locates_the_requested_occurrence() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat sat. the dog saw the cat run.")
        .unwrap();

    let hit = eng.get_context("cat", 1, 2).unwrap();
    assert_eq!(
        &hit.text[hit.match_start..hit.match_end],
        "cat",
        "match span must cover the surface"
    );
    assert!(hit.text.contains("the cat run"));

    assert!(matches!(
        eng.get_context("cat", 5, 2),
        Err(CorpusError::OccurrenceNotFound { ordinal: 5, .. })
    ));
}

#[test]
fn annotated_rendering_reconstructs_the_document() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat, fast and small.").unwrap();

    let spans = eng.render_annotated("a.txt").unwrap();
    let rebuilt: String = spans
        .iter()
        .map(|s| format!("{}{}", s.gap, s.text))
        .collect();
    assert_eq!(rebuilt, "the cat, fast and small.");

    // Punctuation renders with the fallback tag.
    let comma = spans.iter().find(|s| s.text == ",").unwrap();
    assert_eq!(comma.tag, Tag::Other);

    assert!(matches!(
        eng.render_annotated("missing.txt"),
        Err(CorpusError::DocumentNotFound(_))
    ));
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat sat. the dog ran.").unwrap();
    let index = eng.index().find_by_occurrence("cat", 0).unwrap();
    eng.replace_token(index, "tiger").unwrap();
    eng.get_stats();

    let json = serde_json::to_string(&eng.snapshot()).unwrap();
    let snapshot = serde_json::from_str(&json).unwrap();
    let mut restored =
        CorpusEngine::from_snapshot(snapshot, EnglishTagger::new(), RuleLemmatizer::new()).unwrap();

    assert_eq!(restored.buffer().text(), eng.buffer().text());
    assert_eq!(restored.index().tokens(), eng.index().tokens());
    assert_eq!(restored.frequency().words(), eng.frequency().words());
    assert_eq!(restored.word_info("tiger"), eng.word_info("tiger"));
    // The cached stats travel with the snapshot, so no recompute is needed.
    let stats = restored.get_stats().clone();
    assert_eq!(restored.stats_recompute_count(), 0);
    assert_eq!(stats.word_tag_freq[&("tiger".to_string(), Tag::Nn)], 1);
    assert_offsets_consistent(&restored);
}

#[test]
fn corrupt_snapshot_is_rejected() {
    let mut eng = engine();
    eng.ingest("a.txt", "the cat").unwrap();
    let mut snapshot = eng.snapshot();
    snapshot.tokens[0].start += 1;
    assert!(matches!(
        CorpusEngine::from_snapshot(snapshot, EnglishTagger::new(), RuleLemmatizer::new()),
        Err(CorpusError::CorruptSnapshot(_))
    ));
}
