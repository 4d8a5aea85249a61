//! Glob expansion over the project tree.
//!
//! One filesystem walk per call; include and exclude sets are compiled
//! `globset` matchers over normalized relative paths. The walk is sorted by
//! file name, which makes glob-enumeration order deterministic.

use crate::errors::IndexError;
use crate::paths::normalize_rel_path;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub abs: PathBuf,
    /// Normalized root-relative payload key.
    pub rel: String,
}

fn build_set(patterns: &[String]) -> Result<GlobSet, IndexError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Files under `root` matching any include pattern and no exclude pattern,
/// in deterministic walk order.
pub fn scan_globs(
    root: &Path,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<ScannedFile>, IndexError> {
    if include.is_empty() {
        return Ok(Vec::new());
    }
    let include_set = build_set(include)?;
    let exclude_set = build_set(exclude)?;

    let mut out = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = normalize_rel_path(entry.path(), root) else {
            warn!(
                target: "rag_indexer::fs_scan",
                path = %entry.path().display(),
                "path not resolvable against project root, skipping"
            );
            continue;
        };
        if !include_set.is_match(&rel) || exclude_set.is_match(&rel) {
            continue;
        }
        out.push(ScannedFile {
            abs: entry.path().to_path_buf(),
            rel,
        });
    }
    debug!(
        target: "rag_indexer::fs_scan",
        root = %root.display(),
        files = out.len(),
        "scan complete"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_honors_includes_excludes_and_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("docs/b.md"), "# B").unwrap();
        fs::write(dir.path().join("docs/a.md"), "# A").unwrap();
        fs::write(dir.path().join("docs/skip.txt"), "no").unwrap();
        fs::write(dir.path().join("node_modules/pkg/c.md"), "# C").unwrap();

        let files = scan_globs(
            dir.path(),
            &["docs/**/*.md".to_string(), "**/pkg/*.md".to_string()],
            &["**/node_modules/**".to_string()],
        )
        .unwrap();

        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["docs/a.md", "docs/b.md"]);
    }
}
