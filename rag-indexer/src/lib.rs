//! Indexing coordinator: glob walking, incremental per-file upserts, and
//! the soft-delete orphan sweep.

pub mod errors;
pub mod fs_scan;
pub mod orphans;
pub mod paths;
pub mod pipeline;

pub use errors::IndexError;
pub use fs_scan::{ScannedFile, scan_globs};
pub use orphans::{CleanupReport, sweep_orphans};
pub use paths::{is_unresolvable, normalize_rel_path, to_forward_slashes};
pub use pipeline::{IndexReport, Indexer};
