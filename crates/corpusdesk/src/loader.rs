//! Corpus directory loading and snapshot persistence.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use tracing::info;

use corpus_engine::Snapshot;

use crate::handlers::Engine;

/// Strategy for reading corpus files at startup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each file while it is being ingested.
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

/// Ingest every `.txt` file under `dir` in name order. Returns the number of
/// documents loaded.
pub fn load_corpus_dir(engine: &mut Engine, dir: &Path, mode: LoadMode) -> Result<usize> {
    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("read corpus dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        let text = read_file(&path, mode)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        let report = engine
            .ingest(name, &text)
            .with_context(|| format!("ingest {}", path.display()))?;
        info!(
            "loaded {:?} ({} tokens, {} words)",
            report.document.name, report.token_count, report.word_count
        );
        loaded += 1;
    }
    Ok(loaded)
}

fn read_file(path: &Path, mode: LoadMode) -> Result<String> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let map =
                unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
            let text = std::str::from_utf8(&map)
                .with_context(|| format!("{} is not valid utf-8", path.display()))?;
            Ok(text.to_string())
        }
        LoadMode::Owned => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
    }
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path).with_context(|| format!("read snapshot {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse snapshot {}", path.display()))
}

/// Serialize the snapshot as JSON, returning the number of bytes written.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<u64> {
    let json = serde_json::to_vec(snapshot).context("serialize snapshot")?;
    fs::write(path, &json).with_context(|| format!("write snapshot {}", path.display()))?;
    Ok(json.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_lemma::RuleLemmatizer;
    use corpus_tagger::EnglishTagger;
    use corpus_engine::CorpusEngine;

    fn engine() -> Engine {
        CorpusEngine::new(EnglishTagger::new(), RuleLemmatizer::new())
    }

    #[test]
    fn loads_txt_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "the dog").unwrap();
        fs::write(dir.path().join("a.txt"), "the cat").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let mut eng = engine();
        let loaded = load_corpus_dir(&mut eng, dir.path(), LoadMode::Owned).unwrap();
        assert_eq!(loaded, 2);
        let names: Vec<_> = eng
            .buffer()
            .documents()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn mmap_and_owned_modes_agree() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "the cat sat").unwrap();

        let mut owned = engine();
        load_corpus_dir(&mut owned, dir.path(), LoadMode::Owned).unwrap();
        let mut mapped = engine();
        load_corpus_dir(&mut mapped, dir.path(), LoadMode::Mmap).unwrap();
        assert_eq!(owned.buffer().text(), mapped.buffer().text());
    }

    #[test]
    fn invalid_utf8_fails_in_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), [0x66, 0xff, 0xfe]).unwrap();

        for mode in [LoadMode::Mmap, LoadMode::Owned] {
            let mut eng = engine();
            assert!(load_corpus_dir(&mut eng, dir.path(), mode).is_err());
            assert!(eng.buffer().is_empty());
        }
    }

    #[test]
    fn snapshot_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let mut eng = engine();
        eng.ingest("a.txt", "the cat sat.").unwrap();
        let bytes = write_snapshot(&path, &eng.snapshot()).unwrap();
        assert!(bytes > 0);

        let snapshot = read_snapshot(&path).unwrap();
        let restored =
            CorpusEngine::from_snapshot(snapshot, EnglishTagger::new(), RuleLemmatizer::new())
                .unwrap();
        assert_eq!(restored.buffer().text(), eng.buffer().text());
    }
}
