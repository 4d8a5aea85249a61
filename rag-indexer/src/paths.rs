//! Path normalization for payload keys.
//!
//! Every `file_path` stored or compared anywhere is forward-slash,
//! lowercase-drive-letter, project-root-relative. A path that cannot be made
//! relative to the root is skipped by callers (with a warning); it is never
//! allowed to look "orphaned".

use std::path::Path;

/// Root-relative normalized form of `path`, or `None` when it does not live
/// under `root`.
pub fn normalize_rel_path(path: &Path, root: &Path) -> Option<String> {
    let path_s = lowercase_drive(&to_forward_slashes(&path.to_string_lossy()));
    let root_s = lowercase_drive(&to_forward_slashes(&root.to_string_lossy()));
    let root_s = root_s.trim_end_matches('/');

    let rel = if let Some(stripped) = path_s.strip_prefix(root_s) {
        stripped.trim_start_matches('/')
    } else if !path_s.contains(':') && !path_s.starts_with('/') {
        // Already relative.
        path_s.as_str()
    } else {
        return None;
    };

    (!rel.is_empty()).then(|| rel.to_string())
}

pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn lowercase_drive(path: &str) -> String {
    let mut chars: Vec<char> = path.chars().collect();
    if chars.len() >= 2 && chars[1] == ':' && chars[0].is_ascii_uppercase() {
        chars[0] = chars[0].to_ascii_lowercase();
    }
    chars.into_iter().collect()
}

/// True for stored paths that are not root-relative (legacy or foreign data);
/// the orphan sweep must not touch them.
pub fn is_unresolvable(stored_path: &str) -> bool {
    stored_path.starts_with('/') || stored_path.chars().nth(1) == Some(':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_root_and_flips_separators() {
        let root = PathBuf::from("/home/dev/project");
        let path = PathBuf::from("/home/dev/project/docs/a.md");
        assert_eq!(
            normalize_rel_path(&path, &root).as_deref(),
            Some("docs/a.md")
        );
    }

    #[test]
    fn windows_drive_letters_compare_case_insensitively() {
        let root = PathBuf::from("C:\\repo");
        let path = PathBuf::from("c:\\repo\\src\\x.py");
        assert_eq!(
            normalize_rel_path(&path, &root).as_deref(),
            Some("src/x.py")
        );
    }

    #[test]
    fn paths_outside_the_root_are_unresolvable() {
        let root = PathBuf::from("/home/dev/project");
        let path = PathBuf::from("/etc/passwd");
        assert_eq!(normalize_rel_path(&path, &root), None);
    }

    #[test]
    fn stored_absolute_paths_are_flagged() {
        assert!(is_unresolvable("/var/tmp/x.md"));
        assert!(is_unresolvable("c:/repo/x.md"));
        assert!(!is_unresolvable("docs/a.md"));
    }
}
