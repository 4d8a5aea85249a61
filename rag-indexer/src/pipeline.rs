//! Incremental per-file indexing.
//!
//! For every file the coordinator diffs freshly computed chunks against the
//! stored state keyed by `(line_start, content_hash)`: unchanged chunks are
//! skipped, changed ones overwrite in place (ids are deterministic),
//! vanished line starts are soft-deleted, and reappearing soft-deleted
//! chunks are recovered. Re-running over unchanged inputs performs zero
//! writes.

use crate::errors::IndexError;
use crate::fs_scan::ScannedFile;
use code_indexer::{ChunkStrategy, SourceLanguage, chunk_source};
use doc_indexer::{DocChunkOptions, chunk_markdown};
use indicatif::{ProgressBar, ProgressStyle};
use rag_store::{
    Chunk, ChunkFilter, ChunkPoint, ChunkStore, EmbeddingsProvider, scroll_all,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Indexer {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    doc_opts: DocChunkOptions,
    code_strategy: ChunkStrategy,
}

/// Counts for one indexing run; `failed` carries per-file errors without
/// aborting the run.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct IndexReport {
    pub files: usize,
    pub upserted: usize,
    pub skipped: usize,
    pub soft_deleted: usize,
    pub recovered: usize,
    pub failed: Vec<(String, String)>,
}

impl IndexReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Indexer {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        doc_opts: DocChunkOptions,
        code_strategy: ChunkStrategy,
    ) -> Self {
        Self {
            store,
            embedder,
            doc_opts,
            code_strategy,
        }
    }

    /// Indexes files in glob-enumeration order. A per-file failure is
    /// recorded and the run continues; chunks within a file are upserted in
    /// source order.
    pub async fn index_files(
        &self,
        files: &[ScannedFile],
        show_progress: bool,
    ) -> Result<IndexReport, IndexError> {
        self.store
            .ensure_collection(self.embedder.dim())
            .await?;

        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(files.len() as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
                )
                .expect("progress template")
                .progress_chars("##-"),
            );
            bar
        });

        let mut report = IndexReport::default();
        for file in files {
            if let Some(bar) = &bar {
                bar.set_message(file.rel.clone());
            }
            match self.index_file(file).await {
                Ok(outcome) => {
                    report.files += 1;
                    report.upserted += outcome.upserted;
                    report.skipped += outcome.skipped;
                    report.soft_deleted += outcome.soft_deleted;
                    report.recovered += outcome.recovered;
                    report.failed.extend(outcome.failed);
                }
                Err(e) => {
                    warn!(
                        target: "rag_indexer::pipeline",
                        file = %file.rel,
                        error = %e,
                        "file skipped"
                    );
                    report.failed.push((file.rel.clone(), e.to_string()));
                }
            }
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }
        if let Some(bar) = &bar {
            bar.finish_with_message("indexing complete");
        }

        info!(
            target: "rag_indexer::pipeline",
            files = report.files,
            upserted = report.upserted,
            skipped = report.skipped,
            soft_deleted = report.soft_deleted,
            recovered = report.recovered,
            "index run finished"
        );
        Ok(report)
    }

    /// Computes the chunk set for one file. Unknown extensions yield `None`.
    fn chunk_file(&self, rel: &str, source: &str) -> Option<Vec<Chunk>> {
        let ext = rel.rsplit('.').next().unwrap_or("");
        if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") {
            return Some(chunk_markdown(source, rel, &self.doc_opts));
        }
        SourceLanguage::from_extension(ext)
            .map(|lang| chunk_source(source, rel, lang, self.code_strategy).0)
    }

    async fn index_file(&self, file: &ScannedFile) -> Result<IndexReport, IndexError> {
        let source = tokio::fs::read_to_string(&file.abs).await?;
        self.index_content(&file.rel, &source).await
    }

    /// Diffs and applies one file's content against the stored state. Also
    /// the entry point for the document tools, which carry content directly
    /// instead of reading the filesystem.
    pub async fn index_content(&self, rel: &str, source: &str) -> Result<IndexReport, IndexError> {
        let Some(chunks) = self.chunk_file(rel, source) else {
            debug!(target: "rag_indexer::pipeline", file = %rel, "no chunker for extension");
            return Ok(IndexReport::default());
        };

        // Stored state for this file, deleted points included so that
        // reappearing chunks can be recovered in place.
        let mut filter = ChunkFilter::for_file(rel.to_string());
        filter.include_deleted = true;
        let existing = scroll_all(self.store.as_ref(), &filter).await?;
        let existing_by_line: HashMap<u32, (u64, String, bool)> = existing
            .iter()
            .map(|p| {
                (
                    p.payload.line_start,
                    (p.id, p.payload.content_hash.clone(), p.payload.is_deleted),
                )
            })
            .collect();

        let mut outcome = IndexReport::default();
        let mut to_embed: Vec<Chunk> = Vec::new();
        let mut to_recover: Vec<u64> = Vec::new();
        let new_lines: HashSet<u32> = chunks.iter().map(|c| c.payload.line_start).collect();

        for chunk in chunks {
            match existing_by_line.get(&chunk.payload.line_start) {
                Some((id, hash, deleted)) if *hash == chunk.payload.content_hash => {
                    if *deleted {
                        to_recover.push(*id);
                    } else {
                        outcome.skipped += 1;
                    }
                }
                // New line start, or same line with different content: both
                // are plain upserts thanks to id determinism.
                _ => to_embed.push(chunk),
            }
        }

        let to_soft_delete: Vec<u64> = existing
            .iter()
            .filter(|p| !p.payload.is_deleted && !new_lines.contains(&p.payload.line_start))
            .map(|p| p.id)
            .collect();

        if !to_embed.is_empty() {
            let texts: Vec<String> = to_embed.iter().map(|c| c.payload.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            let points: Vec<ChunkPoint> = to_embed
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| ChunkPoint { chunk, vector })
                .collect();
            let batch = self.store.upsert(points).await?;
            outcome.upserted += batch.succeeded.len();
            outcome
                .failed
                .extend(batch.failed.into_iter().map(|(id, e)| (format!("{rel}#{id}"), e)));
        }
        if !to_recover.is_empty() {
            outcome.recovered += self.store.recover_ids(&to_recover).await?;
        }
        if !to_soft_delete.is_empty() {
            outcome.soft_deleted += self.store.soft_delete_ids(&to_soft_delete).await?;
        }

        debug!(
            target: "rag_indexer::pipeline",
            file = %rel,
            upserted = outcome.upserted,
            skipped = outcome.skipped,
            soft_deleted = outcome.soft_deleted,
            recovered = outcome.recovered,
            "file indexed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{HashEmbedder, MemoryStore};
    use std::fs;
    use std::path::Path;

    const DOC: &str = "# Title\n## Features\n1. Alpha\n2. Beta\n3. Gamma\n";

    fn scanned(dir: &Path, rel: &str) -> ScannedFile {
        ScannedFile {
            abs: dir.join(rel),
            rel: rel.to_string(),
        }
    }

    fn indexer(store: Arc<MemoryStore>) -> Indexer {
        Indexer::new(
            store,
            Arc::new(HashEmbedder::new(32)),
            DocChunkOptions::default(),
            ChunkStrategy::default(),
        )
    }

    async fn state_snapshot(store: &MemoryStore) -> Vec<(u64, String, bool)> {
        let mut filter = ChunkFilter::all_active();
        filter.include_deleted = true;
        scroll_all(store, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.payload.content_hash, p.payload.is_deleted))
            .collect()
    }

    #[tokio::test]
    async fn first_index_creates_two_chunks_then_rerun_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), DOC).unwrap();
        let store = Arc::new(MemoryStore::new("local"));
        let indexer = indexer(store.clone());
        let files = vec![scanned(dir.path(), "docs/a.md")];

        let first = indexer.index_files(&files, false).await.unwrap();
        assert_eq!(first.upserted, 2);
        assert_eq!(store.stats().await.unwrap().active, 2);

        // Idempotence: zero upserts, zero soft-deletes on unchanged input.
        let second = indexer.index_files(&files, false).await.unwrap();
        assert_eq!(second.upserted, 0);
        assert_eq!(second.soft_deleted, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn editing_one_list_item_updates_exactly_one_chunk_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), DOC).unwrap();
        let store = Arc::new(MemoryStore::new("local"));
        let indexer = indexer(store.clone());
        let files = vec![scanned(dir.path(), "docs/a.md")];
        indexer.index_files(&files, false).await.unwrap();

        let before = state_snapshot(&store).await;
        fs::write(dir.path().join("docs/a.md"), DOC.replace("Beta", "Bravo")).unwrap();
        let report = indexer.index_files(&files, false).await.unwrap();

        assert_eq!(report.upserted, 1);
        assert_eq!(report.soft_deleted, 0);
        let after = state_snapshot(&store).await;
        // Same ids, one changed hash, no inserts.
        assert_eq!(before.len(), after.len());
        let before_ids: HashSet<u64> = before.iter().map(|(id, ..)| *id).collect();
        let after_ids: HashSet<u64> = after.iter().map(|(id, ..)| *id).collect();
        assert_eq!(before_ids, after_ids);
        let changed = before
            .iter()
            .zip(&after)
            .filter(|(b, a)| b.1 != a.1)
            .count();
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn removed_lines_are_soft_deleted_and_recovered_on_reappearance() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), DOC).unwrap();
        let store = Arc::new(MemoryStore::new("local"));
        let indexer = indexer(store.clone());
        let files = vec![scanned(dir.path(), "docs/a.md")];
        indexer.index_files(&files, false).await.unwrap();

        // Drop the list section entirely.
        fs::write(dir.path().join("docs/a.md"), "# Title\n").unwrap();
        let report = indexer.index_files(&files, false).await.unwrap();
        assert_eq!(report.soft_deleted, 1);
        assert_eq!(store.stats().await.unwrap().deleted, 1);

        // Restore the original file: the deleted chunk is recovered, not
        // re-inserted.
        fs::write(dir.path().join("docs/a.md"), DOC).unwrap();
        let report = indexer.index_files(&files, false).await.unwrap();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.upserted, 0);
        assert_eq!(store.stats().await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn indexing_twice_produces_identical_collection_state() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/x.py"),
            "import os\n\ndef greet():\n    return \"hi\"\n",
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new("local"));
        let indexer = indexer(store.clone());
        let files = vec![scanned(dir.path(), "src/x.py")];

        indexer.index_files(&files, false).await.unwrap();
        let first = state_snapshot(&store).await;
        indexer.index_files(&files, false).await.unwrap();
        let second = state_snapshot(&store).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_file_yields_zero_chunks_without_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.md"), "").unwrap();
        let store = Arc::new(MemoryStore::new("local"));
        let indexer = indexer(store.clone());

        let report = indexer
            .index_files(&[scanned(dir.path(), "empty.md")], false)
            .await
            .unwrap();
        assert!(report.all_ok());
        assert_eq!(report.upserted, 0);
    }
}
