//! Orphan sweep: soft-delete every chunk whose file left the live set.
//!
//! The default is a dry run that only reports; applying the sweep requires
//! the explicit prune flag on the CLI. Physical removal never happens here.

use crate::errors::IndexError;
use crate::paths::is_unresolvable;
use rag_store::{ChunkFilter, ChunkStore, scroll_all};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub orphaned_files: Vec<String>,
    pub chunks_affected: usize,
}

/// Scrolls the active points, groups them by file, and soft-deletes every
/// file not present in `live`. Paths that are not root-relative are skipped
/// with a warning; they are never treated as orphaned.
pub async fn sweep_orphans(
    store: &dyn ChunkStore,
    live: &HashSet<String>,
    dry_run: bool,
) -> Result<CleanupReport, IndexError> {
    let points = scroll_all(store, &ChunkFilter::all_active()).await?;

    let mut by_file: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for p in points {
        if is_unresolvable(&p.payload.file_path) {
            warn!(
                target: "rag_indexer::orphans",
                file = %p.payload.file_path,
                "stored path is not project-relative, skipping"
            );
            continue;
        }
        by_file.entry(p.payload.file_path).or_default().push(p.id);
    }

    let mut report = CleanupReport {
        dry_run,
        ..Default::default()
    };
    let mut ids: Vec<u64> = Vec::new();
    for (file, file_ids) in by_file {
        if live.contains(&file) {
            continue;
        }
        report.chunks_affected += file_ids.len();
        report.orphaned_files.push(file);
        ids.extend(file_ids);
    }

    if dry_run {
        info!(
            target: "rag_indexer::orphans",
            files = report.orphaned_files.len(),
            chunks = report.chunks_affected,
            "dry run: nothing marked"
        );
        return Ok(report);
    }

    if !ids.is_empty() {
        store.soft_delete_ids(&ids).await?;
    }
    info!(
        target: "rag_indexer::orphans",
        files = report.orphaned_files.len(),
        chunks = report.chunks_affected,
        "orphaned chunks soft-deleted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{Chunk, ChunkPayload, ChunkPoint, CollectionStats, ContentType, MemoryStore};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new("local");
        store.ensure_collection(3).await.unwrap();
        let mut points = Vec::new();
        for (path, line) in [("docs/a.md", 1), ("docs/a.md", 5), ("docs/b.md", 1)] {
            points.push(ChunkPoint {
                chunk: Chunk::from_payload(ChunkPayload {
                    content: format!("{path}:{line}"),
                    file_path: path.to_string(),
                    line_start: line,
                    line_end: line,
                    content_type: ContentType::Text,
                    language: None,
                    section: None,
                    doc_type: None,
                    code_type: None,
                    name: None,
                    class_name: None,
                    imports: Vec::new(),
                    list_length: None,
                    is_complete: None,
                    is_deleted: false,
                    content_hash: String::new(),
                }),
                vector: vec![1.0, 0.0, 0.0],
            });
        }
        store.upsert(points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn dry_run_reports_without_marking() {
        let store = seeded().await;
        let live: HashSet<String> = ["docs/b.md".to_string()].into();
        let report = sweep_orphans(&store, &live, true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.orphaned_files, vec!["docs/a.md".to_string()]);
        assert_eq!(report.chunks_affected, 2);
        assert_eq!(store.stats().await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn prune_soft_deletes_orphans_but_keeps_them_recoverable() {
        let store = seeded().await;
        let live: HashSet<String> = ["docs/b.md".to_string()].into();
        let report = sweep_orphans(&store, &live, false).await.unwrap();
        assert_eq!(report.chunks_affected, 2);
        assert_eq!(
            store.stats().await.unwrap(),
            CollectionStats {
                active: 1,
                deleted: 2
            }
        );

        // Nothing was physically removed; recovery restores everything.
        store
            .recover(&ChunkFilter::for_file("docs/a.md"))
            .await
            .unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            CollectionStats {
                active: 3,
                deleted: 0
            }
        );
    }
}
