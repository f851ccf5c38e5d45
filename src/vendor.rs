//! Vendored Graphviz discovery
//!
//! Some deployments ship a Graphviz distribution inside the package tree
//! instead of relying on a host install. This module scans such a vendor
//! directory for `dot` binaries.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const RENDERER_FILE_NAMES: [&str; 2] = ["dot", "dot.exe"];

/// Every vendored `dot` binary under `root`: files only, canonicalized,
/// deduplicated, sorted.
pub fn vendored_renderers(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| {
                RENDERER_FILE_NAMES
                    .iter()
                    .any(|candidate| name.eq_ignore_ascii_case(candidate))
            })
            .unwrap_or(false);
        if !matches {
            continue;
        }
        // Unresolvable entries (dangling symlinks) are skipped, not errors
        let resolved = match entry.path().canonicalize() {
            Ok(path) => path,
            Err(_) => continue,
        };
        found.push(resolved);
    }
    found.sort();
    found.dedup();
    found
}

/// The preferred vendored renderer, if any.
///
/// On Windows only `.exe` candidates qualify; elsewhere the first candidate
/// in sorted order wins.
pub fn find_vendored_renderer(root: &Path) -> Option<PathBuf> {
    let candidates = vendored_renderers(root);
    if cfg!(windows) {
        return candidates
            .into_iter()
            .find(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("exe"))
                    .unwrap_or(false)
            });
    }
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join("no-such-vendor");
        assert!(vendored_renderers(&ghost).is_empty());
        assert!(find_vendored_renderer(&ghost).is_none());
    }

    #[test]
    fn scan_finds_nested_binaries_and_ignores_decoys() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("graphviz").join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::write(bin_dir.join("dot"), b"elf").unwrap();
        fs::write(bin_dir.join("neato"), b"elf").unwrap();
        fs::write(dir.path().join("dotfile.txt"), b"not a renderer").unwrap();

        let found = vendored_renderers(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("dot"));
    }

    #[test]
    fn duplicate_names_across_directories_are_all_reported_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b"] {
            let sub_dir = dir.path().join(sub);
            fs::create_dir_all(&sub_dir).unwrap();
            fs::write(sub_dir.join("dot"), b"elf").unwrap();
        }
        let found = vendored_renderers(dir.path());
        assert_eq!(found.len(), 2);
        assert!(found[0] < found[1]);
    }

    #[cfg(unix)]
    #[test]
    fn preferred_renderer_is_first_sorted_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let sub_dir = dir.path().join("bundle");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(sub_dir.join("dot"), b"elf").unwrap();
        let preferred = find_vendored_renderer(dir.path()).unwrap();
        assert!(preferred.ends_with("dot"));
    }
}
