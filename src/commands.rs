//! Subcommand implementations and exit-code mapping.

use crate::cli::{DeleteArgs, IndexArgs, RecoverArgs};
use api::{AppState, ToolError};
use rag_indexer::{scan_globs, sweep_orphans};
use rag_store::{ChunkFilter, ChunkStore, scroll_all};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const EXIT_OK: i32 = 0;
pub const EXIT_OTHER: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_STORE: i32 = 3;
pub const EXIT_PARTIAL: i32 = 4;

pub fn exit_code_for(e: &ToolError) -> i32 {
    match e {
        ToolError::Config(_) => EXIT_CONFIG,
        ToolError::VectorStoreUnavailable(_) | ToolError::DimensionMismatch { .. } => EXIT_STORE,
        _ => EXIT_OTHER,
    }
}

/// Selected stores with their role labels, cloud first.
fn selected_stores(
    state: &AppState,
    cloud_only: bool,
    local_only: bool,
) -> Vec<(&'static str, Arc<dyn ChunkStore>)> {
    let mut out: Vec<(&'static str, Arc<dyn ChunkStore>)> = Vec::new();
    if !local_only {
        if let Some(cloud) = &state.cloud {
            out.push(("cloud", cloud.clone()));
        }
    }
    if !cloud_only {
        if let Some(local) = &state.local {
            out.push(("local", local.clone()));
        }
    }
    out
}

/// Doc globs per role: the local collection mirrors the cloud docs and adds
/// its own.
fn doc_patterns(state: &AppState, role: &str) -> Vec<String> {
    let cfg = &state.config;
    let mut patterns = cfg.cloud_docs.clone();
    if role == "local" {
        patterns.extend(cfg.local_docs.clone());
    }
    patterns
}

pub async fn index(state: &AppState, args: &IndexArgs) -> Result<i32, ToolError> {
    let do_docs = args.docs || !args.code;
    let do_code = args.code || !args.docs;
    let root = state.config.project_root.clone();
    let exclude = state.config.exclude_patterns.clone();

    let mut partial = false;
    for (role, store) in selected_stores(state, args.cloud, args.local) {
        let mut patterns: Vec<String> = Vec::new();
        if do_docs {
            patterns.extend(doc_patterns(state, role));
        }
        if do_code {
            patterns.extend(state.config.code_paths.clone());
        }

        let files = scan_globs(&root, &patterns, &exclude)?;
        info!(target: "rag_server", role, files = files.len(), "indexing");
        let indexer = state.indexer_for(store.clone());
        let report = indexer.index_files(&files, true).await?;
        println!("{role}: {}", serde_json::to_string_pretty(&report)?);
        if !report.all_ok() {
            partial = true;
        }

        if args.cleanup {
            // The live set spans every configured glob for this collection,
            // not just the scope of this run; a docs-only pass must never
            // orphan code chunks.
            let mut all_patterns = doc_patterns(state, role);
            all_patterns.extend(state.config.code_paths.clone());
            let live: HashSet<String> = scan_globs(&root, &all_patterns, &exclude)?
                .into_iter()
                .map(|f| f.rel)
                .collect();
            let dry_run = args.dry_run || !args.prune;
            let sweep = sweep_orphans(store.as_ref(), &live, dry_run).await?;
            println!("{role} cleanup: {}", serde_json::to_string_pretty(&sweep)?);
        }
    }

    Ok(if partial { EXIT_PARTIAL } else { EXIT_OK })
}

pub async fn stats(state: &AppState) -> Result<i32, ToolError> {
    let mut out = serde_json::Map::new();
    for (role, store) in selected_stores(state, false, false) {
        let stats = store.stats().await?;
        out.insert(
            format!("{role} ({})", store.collection()),
            serde_json::json!(stats),
        );
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(EXIT_OK)
}

pub async fn recover(state: &AppState, args: &RecoverArgs) -> Result<i32, ToolError> {
    let filter = match (&args.file, args.all) {
        (Some(file), false) => ChunkFilter::for_file(file.clone()),
        (None, true) => ChunkFilter::all_active(),
        _ => {
            return Err(ToolError::Validation(
                "pass exactly one of --all / --file".to_string(),
            ));
        }
    };

    for (role, store) in selected_stores(state, false, false) {
        let recovered = store.recover(&filter).await?;
        println!("{role}: recovered {recovered} chunks");
    }
    Ok(EXIT_OK)
}

pub async fn delete(state: &AppState, args: &DeleteArgs) -> Result<i32, ToolError> {
    for (role, store) in selected_stores(state, false, false) {
        let deleted = scroll_all(store.as_ref(), &ChunkFilter::deleted()).await?;
        if !args.confirm {
            println!(
                "{role}: {} soft-deleted chunks would be purged (run with --confirm to apply)",
                deleted.len()
            );
            continue;
        }
        let ids: Vec<u64> = deleted.iter().map(|p| p.id).collect();
        let report = store.delete_by_ids(&ids).await?;
        println!("{role}: purged {} chunks", report.succeeded.len());
        if !report.all_ok() {
            return Ok(EXIT_PARTIAL);
        }
    }
    Ok(EXIT_OK)
}

pub fn clean(state: &AppState) -> Result<i32, ToolError> {
    // Collections are never touched here; only the permitted local cache of
    // model weights goes away.
    let cache_dir = state.config.project_root.join(".rag-cache");
    if cache_dir.exists() {
        std::fs::remove_dir_all(&cache_dir)
            .map_err(|e| ToolError::Config(format!("cache removal failed: {e}")))?;
        println!("removed {}", cache_dir.display());
    } else {
        println!("no local cache at {}", cache_dir.display());
    }
    Ok(EXIT_OK)
}

pub async fn setup(state: &AppState) -> Result<i32, ToolError> {
    let dim = state.embedder.dim();
    for (role, store) in selected_stores(state, false, false) {
        store.ensure_collection(dim).await?;
        let stats = store.stats().await?;
        println!(
            "{role} ({}): ready, dim={dim}, active={}, deleted={}",
            store.collection(),
            stats.active,
            stats.deleted
        );
    }
    if state.cloud.is_none() {
        warn!(target: "rag_server", "no cloud endpoint configured");
    }
    println!("configuration ok: {}", state.config.project_root.display());
    Ok(EXIT_OK)
}
